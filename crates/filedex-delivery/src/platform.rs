//! The chat platform SDK as a consumed interface. `filedex-bot` supplies
//! the real `teloxide`-backed implementation; everything in this crate
//! only depends on this trait, so delivery logic is testable without a
//! live bot token.

use async_trait::async_trait;
use filedex_core::error::Result;
use filedex_core::types::{ChatId, MessageId, PrincipalId};

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Success(MessageId),
    Failed(String),
    FloodWait(u64),
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn send_cached_media(
        &self,
        chat: PrincipalId,
        file_id: &str,
        caption: Option<&str>,
        protect_content: bool,
    ) -> SendOutcome;

    async fn copy_message(
        &self,
        from_chat: ChatId,
        to_chat: PrincipalId,
        message_id: MessageId,
        protect_content: bool,
    ) -> SendOutcome;

    async fn delete_message(&self, chat: PrincipalId, message_id: MessageId) -> Result<()>;

    async fn get_chat_member_status(&self, chat: ChatId, principal: PrincipalId) -> Result<String>;
}
