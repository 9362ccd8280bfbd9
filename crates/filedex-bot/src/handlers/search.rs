//! Plain-text search: any non-command private message is treated as a
//! query against the media index. Results page through inline buttons
//! built on the pagination model; `callback_query` drives page turns.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use filedex_core::types::PrincipalId;
use filedex_query::{build_page_slots, PageSlot, PaginationCallback};

use crate::context::Context;

const PAGE_SIZE: i64 = 10;

fn render_results(files: &[filedex_index::MediaFile]) -> String {
    if files.is_empty() {
        return "No results.".to_string();
    }
    files
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. {}", i + 1, f.file_name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn keyboard(cb: &PaginationCallback, total: i64) -> InlineKeyboardMarkup {
    let current = filedex_query::current_page(cb.offset, PAGE_SIZE);
    let total_pages = filedex_query::total_pages(total, PAGE_SIZE);
    let slots = build_page_slots(current, total_pages);

    let row: Vec<InlineKeyboardButton> = slots
        .into_iter()
        .filter_map(|slot| match slot {
            PageSlot::Page(p) => {
                let offset = ((p as i64) - 1) * PAGE_SIZE;
                let data = PaginationCallback { offset, ..cb.clone() }.encode();
                Some(InlineKeyboardButton::callback(p.to_string(), data))
            }
            PageSlot::Ellipsis => None,
        })
        .collect();

    InlineKeyboardMarkup::new(vec![row])
}

async fn run_search(
    bot: &Bot,
    ctx: &Context,
    chat_id: teloxide::types::ChatId,
    principal_id: PrincipalId,
    query: &str,
    offset: i64,
) -> ResponseResult<()> {
    let is_admin = ctx.is_admin(principal_id.0);
    let owner_id = ctx.is_owner(principal_id.0).then_some(principal_id);
    let outcome = ctx
        .query
        .search(principal_id, owner_id, query, &ctx.config.platform, is_admin, None, offset, PAGE_SIZE, false)
        .await;

    match outcome {
        Ok(outcome) if !outcome.allowed => {
            bot.send_message(chat_id, "You've hit your retrieval limit for today.").await?;
        }
        Ok(outcome) => {
            let cb = PaginationCallback {
                action: "search".to_string(),
                query: query.to_string(),
                file_type: "any".to_string(),
                offset,
                principal_id: principal_id.0,
                use_caption: false,
            };
            let text = render_results(&outcome.files);
            bot.send_message(chat_id, text)
                .reply_markup(keyboard(&cb, outcome.total))
                .await?;
        }
        Err(e) => {
            bot.send_message(chat_id, format!("Search failed: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn on_text(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(principal) = msg.from() else { return Ok(()) };
    let Some(text) = msg.text() else { return Ok(()) };
    if text.starts_with('/') {
        return Ok(());
    }

    run_search(&bot, &ctx, msg.chat.id, PrincipalId(principal.id.0 as i64), text, 0).await
}

pub async fn on_page_turn(bot: Bot, q: CallbackQuery, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(data) = q.data.as_ref() else { return Ok(()) };
    let Ok(cb) = PaginationCallback::parse(data) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    run_search(&bot, &ctx, message.chat.id, PrincipalId(cb.principal_id), &cb.query, cb.offset).await?;
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use filedex_index::MediaFile;

    fn file(name: &str) -> MediaFile {
        MediaFile {
            file_unique_id: name.to_string(),
            file_id: name.to_string(),
            file_ref: None,
            file_name: name.to_string(),
            file_size: 10,
            file_type: "video".to_string(),
            mime_type: None,
            caption: None,
            indexed_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn renders_numbered_file_list() {
        let files = vec![file("a.mp4"), file("b.mp4")];
        let text = render_results(&files);
        assert_eq!(text, "1. a.mp4\n2. b.mp4");
    }

    #[test]
    fn renders_no_results_message() {
        assert_eq!(render_results(&[]), "No results.");
    }

    #[test]
    fn keyboard_offset_tracks_page_number() {
        let cb = PaginationCallback {
            action: "search".to_string(),
            query: "test".to_string(),
            file_type: "any".to_string(),
            offset: 0,
            principal_id: 7,
            use_caption: false,
        };
        let markup = keyboard(&cb, (PAGE_SIZE * 3) as i64);
        let buttons = &markup.inline_keyboard[0];
        assert_eq!(buttons.len(), 3);
        let teloxide::types::InlineKeyboardButtonKind::CallbackData(data) = &buttons[1].kind else {
            panic!("expected callback data button");
        };
        let parsed = PaginationCallback::parse(data).unwrap();
        assert_eq!(parsed.offset, PAGE_SIZE);
    }
}
