//! Media Index: canonical entity store, unique-id deduplication, regex
//! search and bulk operations.

pub mod channels;
pub mod model;
pub mod repository;
pub mod search;

pub use channels::{ChannelStore, IndexedChannel};
pub use model::{IncomingMedia, MediaFile, SaveOutcome, SaveStatus};
pub use repository::MediaRepository;
