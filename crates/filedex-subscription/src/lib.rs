//! Subscription Gate: verifies a principal's membership in every required
//! channel before an action proceeds. Admin and auth-listed principals
//! bypass the check entirely.

use std::sync::Arc;

use tracing::instrument;

use filedex_core::error::Result;
use filedex_core::types::{ChatId, PrincipalId};
use filedex_delivery::PlatformClient;

/// Membership statuses that fail the gate, matching the chat platform's
/// own member-status vocabulary.
const FAILING_STATUSES: &[&str] = &["left", "kicked", "banned"];

#[derive(Debug, Clone)]
pub struct JoinTarget {
    pub channel: ChatId,
}

#[derive(Debug, Clone)]
pub enum GateDecision {
    Allowed,
    /// The principal is missing membership in these channels.
    Blocked(Vec<JoinTarget>),
}

pub struct SubscriptionGate {
    platform: Arc<dyn PlatformClient>,
    required_channels: Vec<ChatId>,
}

impl SubscriptionGate {
    pub fn new(platform: Arc<dyn PlatformClient>, required_channels: Vec<ChatId>) -> Self {
        Self {
            platform,
            required_channels,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn is_subscribed(&self, principal_id: PrincipalId, is_admin_or_auth: bool) -> Result<GateDecision> {
        if is_admin_or_auth || self.required_channels.is_empty() {
            return Ok(GateDecision::Allowed);
        }

        let mut missing = Vec::new();
        for &channel in &self.required_channels {
            let status = self.platform.get_chat_member_status(channel, principal_id).await?;
            if FAILING_STATUSES.contains(&status.as_str()) {
                missing.push(JoinTarget { channel });
            }
        }

        if missing.is_empty() {
            Ok(GateDecision::Allowed)
        } else {
            Ok(GateDecision::Blocked(missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filedex_core::types::MessageId;
    use filedex_delivery::SendOutcome;
    use std::sync::Mutex;

    struct FakePlatform {
        statuses: Mutex<std::collections::HashMap<i64, String>>,
    }

    #[async_trait]
    impl PlatformClient for FakePlatform {
        async fn send_cached_media(
            &self,
            _chat: PrincipalId,
            _file_id: &str,
            _caption: Option<&str>,
            _protect_content: bool,
        ) -> SendOutcome {
            SendOutcome::Success(MessageId(1))
        }

        async fn copy_message(
            &self,
            _from_chat: ChatId,
            _to_chat: PrincipalId,
            _message_id: MessageId,
            _protect_content: bool,
        ) -> SendOutcome {
            SendOutcome::Success(MessageId(1))
        }

        async fn delete_message(&self, _chat: PrincipalId, _message_id: MessageId) -> Result<()> {
            Ok(())
        }

        async fn get_chat_member_status(&self, chat: ChatId, _principal: PrincipalId) -> Result<String> {
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&chat.0)
                .cloned()
                .unwrap_or_else(|| "member".to_string()))
        }
    }

    #[tokio::test]
    async fn admin_bypasses_the_gate_without_any_platform_calls() {
        let platform: Arc<dyn PlatformClient> = Arc::new(FakePlatform {
            statuses: Mutex::new(Default::default()),
        });
        let gate = SubscriptionGate::new(platform, vec![ChatId(-100)]);
        let decision = gate.is_subscribed(PrincipalId(1), true).await.unwrap();
        assert!(matches!(decision, GateDecision::Allowed));
    }

    #[tokio::test]
    async fn missing_membership_lists_the_channel_as_a_join_target() {
        let mut statuses = std::collections::HashMap::new();
        statuses.insert(-100, "left".to_string());
        let platform: Arc<dyn PlatformClient> = Arc::new(FakePlatform {
            statuses: Mutex::new(statuses),
        });
        let gate = SubscriptionGate::new(platform, vec![ChatId(-100)]);

        match gate.is_subscribed(PrincipalId(1), false).await.unwrap() {
            GateDecision::Blocked(targets) => {
                assert_eq!(targets.len(), 1);
                assert_eq!(targets[0].channel, ChatId(-100));
            }
            GateDecision::Allowed => panic!("expected gate to block"),
        }
    }

    #[tokio::test]
    async fn member_status_passes_the_gate() {
        let mut statuses = std::collections::HashMap::new();
        statuses.insert(-100, "member".to_string());
        let platform: Arc<dyn PlatformClient> = Arc::new(FakePlatform {
            statuses: Mutex::new(statuses),
        });
        let gate = SubscriptionGate::new(platform, vec![ChatId(-100)]);
        assert!(matches!(
            gate.is_subscribed(PrincipalId(1), false).await.unwrap(),
            GateDecision::Allowed
        ));
    }
}
