//! The query pipeline: rate limit → access check → search → result
//! session materialization.

use std::sync::Arc;

use filedex_access::{AccessDecision, AccessRepository};
use filedex_core::config::PlatformConfig;
use filedex_core::error::Result;
use filedex_core::types::PrincipalId;
use filedex_index::model::MediaFile;
use filedex_index::MediaRepository;
use filedex_ratelimit::ActionLimiter;

use crate::session::{ResultSession, SessionStore};

pub struct QueryOutcome {
    pub files: Vec<MediaFile>,
    pub next_offset: i64,
    pub total: i64,
    pub allowed: bool,
    pub session: Option<ResultSession>,
}

pub struct QueryPipeline {
    rate_limiter: Arc<ActionLimiter>,
    access: Arc<AccessRepository>,
    media: Arc<MediaRepository>,
    sessions: Arc<SessionStore>,
}

impl QueryPipeline {
    pub fn new(
        rate_limiter: Arc<ActionLimiter>,
        access: Arc<AccessRepository>,
        media: Arc<MediaRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            rate_limiter,
            access,
            media,
            sessions,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn search(
        &self,
        principal_id: PrincipalId,
        owner_id: Option<PrincipalId>,
        query_text: &str,
        platform_config: &PlatformConfig,
        is_admin: bool,
        file_type: Option<&str>,
        offset: i64,
        limit: i64,
        use_caption: bool,
    ) -> Result<QueryOutcome> {
        if self.rate_limiter.check(principal_id, "search").await.is_err() {
            return Ok(QueryOutcome {
                files: Vec::new(),
                next_offset: -1,
                total: 0,
                allowed: false,
                session: None,
            });
        }

        let decision: AccessDecision = self
            .access
            .can_retrieve(principal_id, owner_id, platform_config, is_admin)
            .await?;
        if !decision.allowed {
            return Ok(QueryOutcome {
                files: Vec::new(),
                next_offset: -1,
                total: 0,
                allowed: false,
                session: None,
            });
        }

        let (files, next_offset, total) = self
            .media
            .search_files(query_text, file_type, offset, limit, use_caption)
            .await?;

        // Re-materialized on every page, not just the first, so "Send
        // All" works from whatever page the caller is currently viewing.
        let session = Some(
            self.sessions
                .create(
                    principal_id,
                    query_text,
                    files.iter().map(|f| f.file_unique_id.clone()).collect(),
                )
                .await,
        );

        Ok(QueryOutcome {
            files,
            next_offset,
            total,
            allowed: true,
            session,
        })
    }
}

/// The recommendation surface is not part of the core contract (see
/// design notes). This trait exists so the CLI layer's `recommendations`,
/// `popular_keywords`, and `my_keywords` commands have something to call;
/// the default implementation always returns empty.
#[async_trait::async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn recommendations(&self, _principal_id: PrincipalId) -> Vec<String> {
        Vec::new()
    }

    async fn popular_keywords(&self, _limit: usize) -> Vec<String> {
        Vec::new()
    }

    async fn my_keywords(&self, _principal_id: PrincipalId) -> Vec<String> {
        Vec::new()
    }
}

pub struct NoopRecommendations;

impl RecommendationProvider for NoopRecommendations {}
