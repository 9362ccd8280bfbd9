//! The three delivery entry points: single-file send, result-session bulk
//! send (with atomic quota reservation), and channel-range "DSTORE" send.
//! Every outbound platform call goes through the `platform_send` semaphore
//! and honors a single flood-wait retry.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use filedex_access::AccessRepository;
use filedex_core::config::PlatformConfig;
use filedex_core::error::{Error, Result};
use filedex_core::types::{ChatId, MessageId, PrincipalId};
use filedex_index::MediaRepository;
use filedex_query::SessionStore;
use filedex_ratelimit::SemaphoreSet;

use crate::platform::{PlatformClient, SendOutcome};
use crate::task_registry::TaskRegistry;

const INTER_SEND_DELAY: Duration = Duration::from_secs(1);
const PROGRESS_EVERY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct BulkSendReport {
    pub success: u64,
    pub failed: u64,
}

pub struct DeliveryEngine {
    platform: Arc<dyn PlatformClient>,
    access: Arc<AccessRepository>,
    media: Arc<MediaRepository>,
    sessions: Arc<SessionStore>,
    semaphores: Arc<SemaphoreSet>,
    tasks: Arc<TaskRegistry>,
}

impl DeliveryEngine {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        access: Arc<AccessRepository>,
        media: Arc<MediaRepository>,
        sessions: Arc<SessionStore>,
        semaphores: Arc<SemaphoreSet>,
        tasks: Arc<TaskRegistry>,
    ) -> Self {
        Self {
            platform,
            access,
            media,
            sessions,
            semaphores,
            tasks,
        }
    }

    /// Sends through the platform, retrying exactly once on a flood-wait.
    async fn send_with_flood_retry(&self, chat: PrincipalId, file_id: &str, caption: Option<&str>, protect: bool) -> SendOutcome {
        let _permit = self.semaphores.acquire("platform_send").await;
        let outcome = self.platform.send_cached_media(chat, file_id, caption, protect).await;
        match outcome {
            SendOutcome::FloodWait(secs) => {
                warn!(secs, "flood wait, sleeping and retrying once");
                tokio::time::sleep(Duration::from_secs(secs)).await;
                self.platform.send_cached_media(chat, file_id, caption, protect).await
            }
            other => other,
        }
    }

    async fn copy_with_flood_retry(
        &self,
        from_chat: ChatId,
        to_chat: PrincipalId,
        message_id: MessageId,
        protect: bool,
    ) -> SendOutcome {
        let _permit = self.semaphores.acquire("platform_send").await;
        let outcome = self.platform.copy_message(from_chat, to_chat, message_id, protect).await;
        match outcome {
            SendOutcome::FloodWait(secs) => {
                warn!(secs, "flood wait, sleeping and retrying once");
                tokio::time::sleep(Duration::from_secs(secs)).await;
                self.platform.copy_message(from_chat, to_chat, message_id, protect).await
            }
            other => other,
        }
    }

    /// Single-file send: checks access (incrementing quota on success via
    /// `reserve_quota_atomic(n=1)`), sends, and optionally schedules an
    /// auto-delete task tracked in the registry so shutdown can cancel it.
    #[instrument(level = "debug", skip(self, config))]
    pub async fn send_single(
        &self,
        principal_id: PrincipalId,
        owner_id: Option<PrincipalId>,
        is_admin: bool,
        file_unique_id: &str,
        config: &PlatformConfig,
    ) -> Result<ItemOutcome> {
        let decision = self
            .access
            .can_retrieve(principal_id, owner_id, config, is_admin)
            .await?;
        if !decision.allowed {
            return Err(Error::InsufficientPermissions(format!("{:?}", decision.reason)));
        }

        let file = self
            .media
            .find_file(file_unique_id)
            .await?
            .ok_or_else(|| Error::NotFound(file_unique_id.to_string()))?;

        let needs_quota = decision.needs_quota();
        if needs_quota {
            let (ok, _reserved, msg) = self.access.reserve_quota_atomic(principal_id, 1, config.daily_limit).await?;
            if !ok {
                return Err(Error::RateLimitExceeded {
                    action: "file_request".to_string(),
                    retry_after_secs: 0,
                });
            }
            let _ = msg;
        }

        let outcome = self
            .send_with_flood_retry(principal_id, &file.file_id, file.caption.as_deref(), false)
            .await;

        match outcome {
            SendOutcome::Success(message_id) => {
                if let Some(secs) = config.auto_delete_secs {
                    self.schedule_auto_delete(principal_id, message_id, secs);
                }
                Ok(ItemOutcome::Success)
            }
            SendOutcome::FloodWait(_) => {
                // A second flood-wait surfaces as a platform error per the
                // single-retry policy.
                Err(Error::PlatformApi("repeated flood wait".to_string()))
            }
            SendOutcome::Failed(reason) => Err(Error::PlatformApi(reason)),
        }
    }

    fn schedule_auto_delete(&self, chat: PrincipalId, message_id: MessageId, delay_secs: u64) {
        let platform = self.platform.clone();
        let id = self.tasks.spawn_tracked(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            if let Err(e) = platform.delete_message(chat, message_id).await {
                warn!(error = %e, "auto-delete failed");
            }
        });
        info!(task_id = id, delay_secs, "scheduled auto-delete");
    }

    /// Result-session bulk send: checks access the same way as a single
    /// file, reserves quota for the whole session up front, sends
    /// sequentially with a 1s delay, classifies each outcome, emits a
    /// progress callback every 5 sends, and refunds any unused reservation
    /// at the end.
    #[instrument(level = "debug", skip(self, config, progress))]
    pub async fn send_session(
        &self,
        principal_id: PrincipalId,
        owner_id: Option<PrincipalId>,
        session_id: &str,
        config: &PlatformConfig,
        is_admin: bool,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<BulkSendReport> {
        let decision = self
            .access
            .can_retrieve(principal_id, owner_id, config, is_admin)
            .await?;
        if !decision.allowed {
            return Err(Error::InsufficientPermissions(format!("{:?}", decision.reason)));
        }

        let session = self
            .sessions
            .load(principal_id, session_id)
            .await
            .ok_or_else(|| Error::NotFound("result session".to_string()))?;

        let total = session.file_unique_ids.len() as i64;
        let needs_quota = decision.needs_quota();

        let reserved = if needs_quota {
            let (ok, n, _msg) = self
                .access
                .reserve_quota_atomic(principal_id, total, config.daily_limit)
                .await?;
            if !ok {
                return Err(Error::RateLimitExceeded {
                    action: "file_request".to_string(),
                    retry_after_secs: 0,
                });
            }
            n
        } else {
            total
        };

        let mut report = BulkSendReport::default();
        let mut sent = 0i64;

        for (idx, file_unique_id) in session.file_unique_ids.iter().enumerate() {
            if sent >= reserved {
                break;
            }

            let Some(file) = self.media.find_file(file_unique_id).await? else {
                report.failed += 1;
                continue;
            };

            let outcome = self
                .send_with_flood_retry(principal_id, &file.file_id, file.caption.as_deref(), false)
                .await;

            match outcome {
                SendOutcome::Success(_) => report.success += 1,
                _ => report.failed += 1,
            }
            sent += 1;

            if (idx + 1) % PROGRESS_EVERY == 0 {
                progress(idx + 1, session.file_unique_ids.len());
            }

            if idx + 1 < session.file_unique_ids.len() {
                tokio::time::sleep(INTER_SEND_DELAY).await;
            }
        }

        if needs_quota {
            let unused = reserved - sent;
            if unused > 0 {
                self.access.release_quota(principal_id, unused).await?;
            }
        }

        Ok(report)
    }

    /// Range ("DSTORE") send: copies every message in `[first, last]` to
    /// the target principal, in ascending 200-message slices, under the
    /// same pacing and flood-wait retry policy as single-file send.
    #[instrument(level = "debug", skip(self, progress))]
    pub async fn send_range(
        &self,
        principal_id: PrincipalId,
        source_chat: ChatId,
        first_msg_id: i64,
        last_msg_id: i64,
        protect_content: bool,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<BulkSendReport> {
        let slices = filedex_ingest::range::slice_range(first_msg_id, last_msg_id);
        let total: i64 = slices.iter().map(|(a, b)| b - a + 1).sum();
        let mut report = BulkSendReport::default();
        let mut done = 0usize;

        for (start, end) in slices {
            let mut msg_id = start;
            while msg_id <= end {
                let outcome = self
                    .copy_with_flood_retry(source_chat, principal_id, MessageId(msg_id), protect_content)
                    .await;
                match outcome {
                    SendOutcome::Success(_) => report.success += 1,
                    _ => report.failed += 1,
                }
                done += 1;
                if done % PROGRESS_EVERY == 0 {
                    progress(done, total as usize);
                }
                msg_id += 1;
                if msg_id <= end {
                    tokio::time::sleep(INTER_SEND_DELAY).await;
                }
            }
        }

        Ok(report)
    }
}
