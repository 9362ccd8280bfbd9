//! The concrete `PlatformClient`: every outbound call the delivery,
//! broadcast and subscription crates need, implemented against `teloxide`.
//!
//! Cached media is always sent through `send_document` — the bot never
//! has the original file's kind at the call site (only its cached
//! `file_id`), and a document send round-trips any file kind back to the
//! recipient unmodified. Decided in favor of re-threading `FileType`
//! through every call site in the three platform-agnostic crates.

use std::time::Duration;

use async_trait::async_trait;
use teloxide::payloads::{CopyMessageSetters, SendDocumentSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, InputFile, UserId};
use teloxide::RequestError;

use filedex_core::error::{Error, Result};
use filedex_core::types::{ChatId, MessageId, PrincipalId};
use filedex_delivery::{PlatformClient, SendOutcome};
use filedex_ratelimit::CircuitBreaker;

const ENDPOINT: &str = "telegram_api";

pub struct TeloxidePlatform {
    pub bot: Bot,
    breaker: CircuitBreaker,
}

impl TeloxidePlatform {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            breaker: CircuitBreaker::new(5, Duration::from_secs(30)),
        }
    }
}

fn classify_request_error(e: RequestError) -> SendOutcome {
    match e {
        RequestError::RetryAfter(secs) => SendOutcome::FloodWait(secs.seconds().as_secs()),
        other => SendOutcome::Failed(other.to_string()),
    }
}

#[async_trait]
impl PlatformClient for TeloxidePlatform {
    async fn send_cached_media(
        &self,
        chat: PrincipalId,
        file_id: &str,
        caption: Option<&str>,
        protect_content: bool,
    ) -> SendOutcome {
        let outcome = self
            .breaker
            .call(ENDPOINT, || async {
                let mut req = self
                    .bot
                    .send_document(TgChatId(chat.0), InputFile::file_id(file_id))
                    .protect_content(protect_content);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                req.await
            })
            .await;

        match outcome {
            None => SendOutcome::Failed(format!("circuit open for {ENDPOINT}")),
            Some(Ok(message)) => SendOutcome::Success(MessageId(message.id.0 as i64)),
            Some(Err(e)) => classify_request_error(e),
        }
    }

    async fn copy_message(
        &self,
        from_chat: ChatId,
        to_chat: PrincipalId,
        message_id: MessageId,
        protect_content: bool,
    ) -> SendOutcome {
        let outcome = self
            .breaker
            .call(ENDPOINT, || async {
                self.bot
                    .copy_message(
                        TgChatId(to_chat.0),
                        TgChatId(from_chat.0),
                        teloxide::types::MessageId(message_id.0 as i32),
                    )
                    .protect_content(protect_content)
                    .await
            })
            .await;

        match outcome {
            None => SendOutcome::Failed(format!("circuit open for {ENDPOINT}")),
            Some(Ok(copied)) => SendOutcome::Success(MessageId(copied.0 .0 as i64)),
            Some(Err(e)) => classify_request_error(e),
        }
    }

    async fn delete_message(&self, chat: PrincipalId, message_id: MessageId) -> Result<()> {
        let outcome = self
            .breaker
            .call(ENDPOINT, || async {
                self.bot
                    .delete_message(TgChatId(chat.0), teloxide::types::MessageId(message_id.0 as i32))
                    .await
            })
            .await;

        match outcome {
            None => Err(Error::PlatformApi(format!("circuit open for {ENDPOINT}"))),
            Some(r) => r.map(|_| ()).map_err(|e| Error::PlatformApi(e.to_string())),
        }
    }

    async fn get_chat_member_status(&self, chat: ChatId, principal: PrincipalId) -> Result<String> {
        let outcome = self
            .breaker
            .call(ENDPOINT, || async {
                self.bot
                    .get_chat_member(TgChatId(chat.0), UserId(principal.0 as u64))
                    .await
            })
            .await;

        let member = match outcome {
            None => return Err(Error::PlatformApi(format!("circuit open for {ENDPOINT}"))),
            Some(r) => r.map_err(|e| Error::PlatformApi(e.to_string()))?,
        };

        let status = match member.kind {
            teloxide::types::ChatMemberKind::Owner(_) => "owner",
            teloxide::types::ChatMemberKind::Administrator(_) => "administrator",
            teloxide::types::ChatMemberKind::Member => "member",
            teloxide::types::ChatMemberKind::Restricted(_) => "restricted",
            teloxide::types::ChatMemberKind::Left => "left",
            teloxide::types::ChatMemberKind::Banned(_) => "banned",
        };
        Ok(status.to_string())
    }
}
