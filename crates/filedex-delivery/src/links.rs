//! Shareable link encode/decode and the platform message-link parser.
//!
//! A start payload is one of:
//! - `file_<id>` / `filep_<id>` — single file, "p" suffix means protected
//!   content.
//! - `DSTORE-<b64>` where the inner base64 decodes to
//!   `<from_id>_<to_id>_<chat_id>_(batch|pbatch)`.
//! - `PBLINK-<batch_id>` — a persisted `BatchLink`.
//! - `sendall_<session_key>` — replays a previously materialized result
//!   session.
//!
//! The whole payload is itself carried as a URL-safe, unpadded base64
//! string in the platform's deep-link `start` parameter; `encode_start_payload`
//! / `decode_start_payload` do that outer wrapping.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use regex::Regex;

use filedex_core::error::{Error, Result};
use filedex_core::types::{ChatId, MessageId};
use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    Batch,
    ProtectedBatch,
}

impl RangeKind {
    fn as_str(&self) -> &'static str {
        match self {
            RangeKind::Batch => "batch",
            RangeKind::ProtectedBatch => "pbatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLink {
    File { id: String, protected: bool },
    DirectStoreRange(RangePayload),
    BatchLink(String),
    SendAll(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePayload {
    pub from_id: i64,
    pub to_id: i64,
    pub chat_id: i64,
    pub kind: RangeKind,
}

const MAX_RANGE_SIZE: i64 = 10_000;

impl RangePayload {
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}_{}_{}_{}",
            self.from_id,
            self.to_id,
            self.chat_id,
            self.kind.as_str()
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| Error::InvalidLink("malformed DSTORE payload".into()))?;
        let raw = String::from_utf8(raw).map_err(|_| Error::InvalidLink("malformed DSTORE payload".into()))?;

        let parts: Vec<&str> = raw.splitn(4, '_').collect();
        let [from_s, to_s, chat_s, kind_s] = parts[..] else {
            return Err(Error::InvalidLink("malformed DSTORE payload".into()));
        };

        let from_id: i64 = from_s
            .parse()
            .map_err(|_| Error::InvalidLink("malformed DSTORE payload".into()))?;
        let to_id: i64 = to_s
            .parse()
            .map_err(|_| Error::InvalidLink("malformed DSTORE payload".into()))?;
        let chat_id: i64 = chat_s
            .parse()
            .map_err(|_| Error::InvalidLink("malformed DSTORE payload".into()))?;
        let kind = match kind_s {
            "batch" => RangeKind::Batch,
            "pbatch" => RangeKind::ProtectedBatch,
            _ => return Err(Error::InvalidLink("malformed DSTORE payload".into())),
        };

        if to_id < from_id {
            return Err(Error::InvalidLink("inverted DSTORE range".into()));
        }
        if to_id - from_id + 1 > MAX_RANGE_SIZE {
            return Err(Error::InvalidLink("DSTORE range too large".into()));
        }

        Ok(Self {
            from_id,
            to_id,
            chat_id,
            kind,
        })
    }
}

pub fn encode_share_link(link: &ShareLink) -> String {
    match link {
        ShareLink::File { id, protected } => {
            if *protected {
                format!("filep_{id}")
            } else {
                format!("file_{id}")
            }
        }
        ShareLink::DirectStoreRange(range) => format!("DSTORE-{}", range.encode()),
        ShareLink::BatchLink(batch_id) => format!("PBLINK-{batch_id}"),
        ShareLink::SendAll(session_key) => format!("sendall_{session_key}"),
    }
}

pub fn decode_share_link(payload: &str) -> Result<ShareLink> {
    if let Some(rest) = payload.strip_prefix("filep_") {
        return Ok(ShareLink::File {
            id: rest.to_string(),
            protected: true,
        });
    }
    if let Some(rest) = payload.strip_prefix("file_") {
        return Ok(ShareLink::File {
            id: rest.to_string(),
            protected: false,
        });
    }
    if let Some(rest) = payload.strip_prefix("DSTORE-") {
        return Ok(ShareLink::DirectStoreRange(RangePayload::decode(rest)?));
    }
    if let Some(rest) = payload.strip_prefix("PBLINK-") {
        return Ok(ShareLink::BatchLink(rest.to_string()));
    }
    if let Some(rest) = payload.strip_prefix("sendall_") {
        return Ok(ShareLink::SendAll(rest.to_string()));
    }
    Err(Error::InvalidLink(format!("unrecognized payload: {payload}")))
}

/// Wraps an already-encoded payload (e.g. `file_<id>`) in the outer
/// base64 the deep-link `start` parameter carries.
pub fn encode_start_payload(payload: &str) -> String {
    URL_SAFE_NO_PAD.encode(payload.as_bytes())
}

pub fn decode_start_payload(encoded: &str) -> Result<String> {
    let raw = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| Error::InvalidLink("malformed start payload".into()))?;
    String::from_utf8(raw).map_err(|_| Error::InvalidLink("malformed start payload".into()))
}

static MESSAGE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:t\.me|telegram\.me|telegram\.dog)/(c/)?([A-Za-z0-9_]+)/(\d+)/?$")
        .expect("message link regex is valid")
});

/// Parses `https://(t.me|telegram.me|telegram.dog)/[c/]<chat>/<msg_id>`.
/// `/c/` links carry a bare internal chat id that needs the `-100` prefix
/// re-added to become a real supergroup/channel id. Message id must be
/// strictly positive.
pub fn parse_message_link(url: &str) -> Result<(ChatId, MessageId)> {
    let caps = MESSAGE_LINK_RE
        .captures(url.trim())
        .ok_or_else(|| Error::InvalidLink(format!("unrecognized message link: {url}")))?;
    let is_private = caps.get(1).is_some();
    let chat_token = &caps[2];
    let msg_id: i64 = caps[3]
        .parse()
        .map_err(|_| Error::InvalidLink("malformed message id".into()))?;
    if msg_id <= 0 {
        return Err(Error::InvalidLink("message id must be positive".into()));
    }

    if !is_private {
        // Public channel usernames can't be resolved to a numeric id here;
        // callers holding only a username must resolve it via the
        // platform client before constructing a ChatId.
        return Err(Error::InvalidLink(
            "public channel links require platform resolution".into(),
        ));
    }

    let numeric: i64 = chat_token
        .parse()
        .map_err(|_| Error::InvalidLink("malformed private chat id".into()))?;
    let chat_id: i64 = format!("-100{numeric}")
        .parse()
        .map_err(|_| Error::InvalidLink("chat id overflow".into()))?;

    Ok((ChatId(chat_id), MessageId(msg_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_links_round_trip_with_protected_flag() {
        let link = ShareLink::File {
            id: "abc123".into(),
            protected: true,
        };
        let encoded = encode_share_link(&link);
        assert_eq!(encoded, "filep_abc123");
        assert_eq!(decode_share_link(&encoded).unwrap(), link);
    }

    #[test]
    fn file_link_without_protected_flag_round_trips() {
        let link = ShareLink::File {
            id: "xyz".into(),
            protected: false,
        };
        assert_eq!(encode_share_link(&link), "file_xyz");
    }

    #[test]
    fn dstore_range_round_trips() {
        let range = RangePayload {
            from_id: 10,
            to_id: 50,
            chat_id: -100123456,
            kind: RangeKind::ProtectedBatch,
        };
        let link = ShareLink::DirectStoreRange(range.clone());
        let encoded = encode_share_link(&link);
        assert!(encoded.starts_with("DSTORE-"));
        match decode_share_link(&encoded).unwrap() {
            ShareLink::DirectStoreRange(decoded) => assert_eq!(decoded, range),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn oversized_range_is_rejected() {
        let range = RangePayload {
            from_id: 1,
            to_id: 20_000,
            chat_id: -1,
            kind: RangeKind::Batch,
        };
        let encoded = range.encode();
        assert!(RangePayload::decode(&encoded).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let range = RangePayload {
            from_id: 50,
            to_id: 10,
            chat_id: -1,
            kind: RangeKind::Batch,
        };
        assert!(RangePayload::decode(&range.encode()).is_err());
    }

    #[test]
    fn batch_and_sendall_links_round_trip() {
        let batch = ShareLink::BatchLink("9f3".into());
        assert_eq!(encode_share_link(&batch), "PBLINK-9f3");
        assert_eq!(decode_share_link("PBLINK-9f3").unwrap(), batch);

        let sendall = ShareLink::SendAll("ab12cd34".into());
        assert_eq!(encode_share_link(&sendall), "sendall_ab12cd34");
        assert_eq!(decode_share_link("sendall_ab12cd34").unwrap(), sendall);
    }

    #[test]
    fn start_payload_round_trips_through_outer_base64() {
        let payload = encode_share_link(&ShareLink::File {
            id: "42".into(),
            protected: false,
        });
        let wrapped = encode_start_payload(&payload);
        assert_eq!(decode_start_payload(&wrapped).unwrap(), payload);
    }

    #[test]
    fn private_message_link_reattaches_dash_100_prefix() {
        let (chat, msg) = parse_message_link("https://t.me/c/1234567890/42").unwrap();
        assert_eq!(chat.0, -1001234567890);
        assert_eq!(msg.0, 42);
    }

    #[test]
    fn public_message_link_without_numeric_chat_is_rejected() {
        assert!(parse_message_link("https://t.me/somepublicchannel/42").is_err());
    }

    #[test]
    fn zero_message_id_is_rejected() {
        assert!(parse_message_link("https://t.me/c/55/0").is_err());
    }

    #[test]
    fn alternate_hosts_are_accepted() {
        assert!(parse_message_link("https://telegram.me/c/55/1").is_ok());
        assert!(parse_message_link("https://telegram.dog/c/55/1").is_ok());
    }

    #[test]
    fn malformed_link_is_rejected() {
        assert!(parse_message_link("https://example.com/c/55/1").is_err());
        assert!(parse_message_link("not a url").is_err());
    }
}
