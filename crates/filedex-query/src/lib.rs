//! Query Pipeline: text-to-page resolution, result sessions and
//! pagination.

pub mod pagination;
pub mod pipeline;
pub mod session;

pub use pagination::{build_page_slots, current_page, total_pages, PageSlot, PaginationCallback};
pub use pipeline::{NoopRecommendations, QueryOutcome, QueryPipeline, RecommendationProvider};
pub use session::{ResultSession, SessionStore};
