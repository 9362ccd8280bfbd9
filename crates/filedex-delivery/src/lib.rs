//! Delivery Engine: single-file send, result-session bulk send with
//! atomic quota reservation, channel-range "DSTORE" send, and the
//! shareable-link / batch-link surfaces that feed them.

pub mod delivery;
pub mod filestore;
pub mod links;
pub mod platform;
pub mod task_registry;

pub use delivery::{BulkSendReport, DeliveryEngine, ItemOutcome};
pub use filestore::{BatchLink, BatchLinkStore};
pub use links::{
    decode_share_link, decode_start_payload, encode_share_link, encode_start_payload,
    parse_message_link, RangeKind, RangePayload, ShareLink,
};
pub use platform::{PlatformClient, SendOutcome};
pub use task_registry::TaskRegistry;
