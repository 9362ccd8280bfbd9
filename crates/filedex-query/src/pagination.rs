//! Purely derived pagination model: `current_page`/`total_pages` follow
//! mechanically from `(offset, limit, total)`, and the button layout is a
//! deterministic function of `(current_page, total_pages)` capped at 8
//! buttons per row.

use filedex_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u64),
    Ellipsis,
}

const MAX_BUTTONS: usize = 8;

pub fn current_page(offset: i64, page_size: i64) -> u64 {
    ((offset.max(0) / page_size.max(1)) + 1) as u64
}

pub fn total_pages(total: i64, page_size: i64) -> u64 {
    if total <= 0 {
        return 1;
    }
    ((total + page_size - 1) / page_size.max(1)) as u64
}

/// Builds the page-button layout: boundaries always shown, a symmetric
/// ±1 window around `current`, remaining slots filled from the head/tail,
/// ellipses inserted to mark gaps, all capped at 8 total slots.
pub fn build_page_slots(current: u64, total: u64) -> Vec<PageSlot> {
    let total = total.max(1);
    let current = current.clamp(1, total);

    if total as usize <= MAX_BUTTONS {
        return (1..=total).map(PageSlot::Page).collect();
    }

    let mut picked: Vec<u64> = vec![1, total];
    for p in current.saturating_sub(1)..=current.saturating_add(1) {
        if p >= 1 && p <= total && !picked.contains(&p) {
            picked.push(p);
        }
    }
    picked.sort_unstable();
    picked.dedup();

    // Fill remaining slots by walking outward from just after the head and
    // just before the tail, alternating sides, for a bounded number of
    // steps — at most MAX_BUTTONS iterations, so this always terminates.
    let mut grow_head = true;
    for _ in 0..MAX_BUTTONS {
        if picked.len() >= MAX_BUTTONS {
            break;
        }
        let head = *picked.first().unwrap();
        let tail = *picked.last().unwrap();
        let candidate = if grow_head { head + 1 } else { tail.saturating_sub(1) };
        grow_head = !grow_head;

        if candidate < 1 || candidate > total || picked.contains(&candidate) {
            continue;
        }
        picked.push(candidate);
        picked.sort_unstable();
    }

    picked.dedup();

    let render = |picked: &[u64]| -> Vec<PageSlot> {
        let mut slots = Vec::new();
        for (i, &p) in picked.iter().enumerate() {
            if i > 0 && p > picked[i - 1] + 1 {
                slots.push(PageSlot::Ellipsis);
            }
            slots.push(PageSlot::Page(p));
        }
        slots
    };

    // Ellipses themselves occupy a slot, so a page list with many gaps can
    // render to more than MAX_BUTTONS slots. Drop the picked page farthest
    // from `current` (never the boundaries) until it fits; this always
    // terminates since picked shrinks by one each iteration.
    while render(&picked).len() > MAX_BUTTONS && picked.len() > 2 {
        let drop_idx = picked
            .iter()
            .enumerate()
            .filter(|(_, &p)| p != 1 && p != total)
            .max_by_key(|(_, &p)| p.abs_diff(current))
            .map(|(i, _)| i);
        match drop_idx {
            Some(i) => {
                picked.remove(i);
            }
            None => break,
        }
    }

    render(&picked)
}

/// The pagination callback_data contract: legacy 5-field and canonical
/// 6-field variants are both accepted on input; only the 6-field form is
/// ever emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCallback {
    pub action: String,
    pub query: String,
    pub file_type: String,
    pub offset: i64,
    pub principal_id: i64,
    pub use_caption: bool,
}

impl PaginationCallback {
    /// Emits the canonical 6-field form: `action|query|file_type|offset|principal_id|use_caption`.
    pub fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.action,
            self.query,
            self.file_type,
            self.offset,
            self.principal_id,
            if self.use_caption { 1 } else { 0 }
        )
    }

    /// Parses either the legacy 5-field form (no `use_caption`, defaults to
    /// false) or the canonical 6-field form.
    pub fn parse(data: &str) -> Result<Self> {
        let parts: Vec<&str> = data.split('|').collect();
        match parts.as_slice() {
            [action, query, file_type, offset, principal_id] => Ok(Self {
                action: action.to_string(),
                query: query.to_string(),
                file_type: file_type.to_string(),
                offset: offset
                    .parse()
                    .map_err(|_| Error::InvalidInput("bad offset in callback_data".into()))?,
                principal_id: principal_id
                    .parse()
                    .map_err(|_| Error::InvalidInput("bad principal_id in callback_data".into()))?,
                use_caption: false,
            }),
            [action, query, file_type, offset, principal_id, use_caption] => Ok(Self {
                action: action.to_string(),
                query: query.to_string(),
                file_type: file_type.to_string(),
                offset: offset
                    .parse()
                    .map_err(|_| Error::InvalidInput("bad offset in callback_data".into()))?,
                principal_id: principal_id
                    .parse()
                    .map_err(|_| Error::InvalidInput("bad principal_id in callback_data".into()))?,
                use_caption: *use_caption == "1",
            }),
            _ => Err(Error::InvalidInput(format!(
                "callback_data has {} fields, expected 5 or 6",
                parts.len()
            ))),
        }
    }

    pub fn calculate_new_offset(&self, direction: i64, page_size: i64) -> i64 {
        (self.offset + direction * page_size).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_page_and_total_pages_follow_the_derivation() {
        assert_eq!(current_page(0, 10), 1);
        assert_eq!(current_page(20, 10), 3);
        assert_eq!(total_pages(95, 10), 10);
        assert_eq!(total_pages(0, 10), 1);
    }

    #[test]
    fn small_total_shows_every_page_uncapped() {
        let slots = build_page_slots(1, 5);
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn large_total_is_capped_at_eight_slots_and_in_range() {
        for current in [1u64, 5, 50, 99, 100] {
            let slots = build_page_slots(current, 100);
            assert!(slots.len() <= 8, "slots={:?}", slots);
            assert!(slots.contains(&PageSlot::Page(1)));
            assert!(slots.contains(&PageSlot::Page(100)));
        }
    }

    #[test]
    fn legacy_five_field_callback_parses_with_default_use_caption() {
        let cb = PaginationCallback::parse("search|avatar|video|10|100").unwrap();
        assert!(!cb.use_caption);
        assert_eq!(cb.offset, 10);
    }

    #[test]
    fn six_field_callback_round_trips_through_encode() {
        let cb = PaginationCallback {
            action: "search".into(),
            query: "avatar".into(),
            file_type: "video".into(),
            offset: 10,
            principal_id: 100,
            use_caption: true,
        };
        let encoded = cb.encode();
        assert_eq!(encoded.split('|').count(), 6);
        let parsed = PaginationCallback::parse(&encoded).unwrap();
        assert_eq!(parsed, cb);
    }
}
