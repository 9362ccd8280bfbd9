//! Paged fan-out across all non-banned principals, with adaptive
//! inter-page pacing and outcome classification. Gated by the `broadcast`
//! rate limit (default 1/hour/initiator) at the caller boundary.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use filedex_access::AccessRepository;
use filedex_core::error::Result;
use filedex_core::types::{ChatId, MessageId, PrincipalId};
use filedex_delivery::{PlatformClient, SendOutcome};
use filedex_ratelimit::SemaphoreSet;

use crate::classify::{classify_failure, FailureClass};

const PAGE_SIZE: i64 = 50;
const BASE_INTER_PAGE_DELAY: Duration = Duration::from_millis(500);
const SUCCESS_RATE_FLOOR: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct BroadcastReport {
    pub total: u64,
    pub succeeded: u64,
    pub blocked: u64,
    pub deleted: u64,
    pub failed: u64,
}

pub struct BroadcastEngine {
    access: Arc<AccessRepository>,
    platform: Arc<dyn PlatformClient>,
    semaphores: Arc<SemaphoreSet>,
}

impl BroadcastEngine {
    pub fn new(
        access: Arc<AccessRepository>,
        platform: Arc<dyn PlatformClient>,
        semaphores: Arc<SemaphoreSet>,
    ) -> Self {
        Self {
            access,
            platform,
            semaphores,
        }
    }

    #[instrument(level = "debug", skip(self, progress, cancel))]
    pub async fn run(
        &self,
        source_chat: ChatId,
        message_id: MessageId,
        mut cancel: tokio::sync::watch::Receiver<bool>,
        mut progress: impl FnMut(&BroadcastReport),
    ) -> Result<BroadcastReport> {
        let mut report = BroadcastReport::default();
        let mut after_id = 0i64;
        let mut inter_page_delay = BASE_INTER_PAGE_DELAY;

        loop {
            if *cancel.borrow() {
                info!(after_id, "broadcast cancelled by admin");
                break;
            }
            let page = self.access.list_broadcastable_page(after_id, PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            after_id = page.last().map(|p| p.id).unwrap_or(after_id);

            let mut page_success = 0u64;
            for principal in &page {
                if *cancel.borrow() {
                    break;
                }
                let _permit = self.semaphores.acquire("platform_send").await;
                let outcome = self
                    .platform
                    .copy_message(source_chat, PrincipalId(principal.id), message_id, false)
                    .await;

                report.total += 1;
                match outcome {
                    SendOutcome::Success(_) => {
                        report.succeeded += 1;
                        page_success += 1;
                    }
                    SendOutcome::FloodWait(secs) => {
                        tokio::time::sleep(Duration::from_secs(secs)).await;
                        report.failed += 1;
                    }
                    SendOutcome::Failed(reason) => match classify_failure(&reason) {
                        FailureClass::Blocked => report.blocked += 1,
                        FailureClass::Deleted => {
                            report.deleted += 1;
                            if let Err(e) = self.access.delete_principal(PrincipalId(principal.id)).await {
                                warn!(error = %e, principal = principal.id, "failed to drop deleted principal");
                            }
                        }
                        FailureClass::Failed => report.failed += 1,
                    },
                }
            }

            progress(&report);

            let success_rate = page_success as f64 / page.len() as f64;
            if success_rate < SUCCESS_RATE_FLOOR {
                inter_page_delay *= 2;
            }
            info!(after_id, success_rate, ?inter_page_delay, "broadcast page complete");

            if page.len() < PAGE_SIZE as usize {
                break;
            }
            tokio::time::sleep(inter_page_delay).await;
        }

        Ok(report)
    }
}
