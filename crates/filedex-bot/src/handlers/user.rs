//! `start`/`help`/`about`/`stats`/`plans`/`request_stats`/`my_keywords`/
//! `popular_keywords`/`recommendations` — the surface any principal can
//! use without admin rights.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use filedex_access::AccessReason;
use filedex_core::types::PrincipalId;
use filedex_delivery::{decode_share_link, decode_start_payload, ShareLink};

use crate::commands::Command;
use crate::context::Context;

pub async fn help(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

pub async fn about(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(
        msg.chat.id,
        "A media index and distribution bot: search the index, share files by link, \
         or ask an admin to index a channel.",
    )
    .await?;
    Ok(())
}

pub async fn start(bot: Bot, msg: Message, ctx: Arc<Context>, payload: String) -> ResponseResult<()> {
    let Some(principal) = msg.from() else {
        return Ok(());
    };
    let principal_id = PrincipalId(principal.id.0 as i64);
    let _ = ctx
        .access
        .get_or_create(principal_id, &principal.full_name())
        .await;

    if payload.trim().is_empty() {
        bot.send_message(msg.chat.id, "Welcome. Send /help to see what I can do.")
            .await?;
        return Ok(());
    }

    let is_admin_or_auth = ctx.is_auth(principal_id.0);
    match ctx.subscription_gate.is_subscribed(principal_id, is_admin_or_auth).await {
        Ok(filedex_subscription::GateDecision::Blocked(targets)) => {
            let channels = targets
                .iter()
                .map(|t| format!("- join chat {}", t.channel))
                .collect::<Vec<_>>()
                .join("\n");
            bot.send_message(
                msg.chat.id,
                format!("Join the required channels first, then press /start again:\n{channels}"),
            )
            .await?;
            return Ok(());
        }
        Ok(filedex_subscription::GateDecision::Allowed) => {}
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not verify channel membership: {e}"))
                .await?;
            return Ok(());
        }
    }

    let decoded = decode_start_payload(&payload).unwrap_or(payload);
    let share_link = match decode_share_link(&decoded) {
        Ok(link) => link,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Invalid link: {e}")).await?;
            return Ok(());
        }
    };

    deliver_share_link(bot, msg, ctx, principal_id, share_link).await
}

async fn deliver_share_link(
    bot: Bot,
    msg: Message,
    ctx: Arc<Context>,
    principal_id: PrincipalId,
    link: ShareLink,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let is_admin = ctx.is_admin(principal_id.0);
    let owner_id = ctx.is_owner(principal_id.0).then_some(principal_id);

    match link {
        ShareLink::File { id, .. } => {
            match ctx
                .delivery
                .send_single(principal_id, owner_id, is_admin, &id, &ctx.config.platform)
                .await
            {
                Ok(filedex_delivery::ItemOutcome::Success) => {}
                Ok(filedex_delivery::ItemOutcome::Failed) => {
                    bot.send_message(chat_id, "Delivery failed.").await?;
                }
                Err(e) => {
                    bot.send_message(chat_id, format!("Could not deliver that file: {e}"))
                        .await?;
                }
            }
        }
        ShareLink::DirectStoreRange(range) => {
            let protect = matches!(range.kind, filedex_delivery::RangeKind::ProtectedBatch);
            let report = ctx
                .delivery
                .send_range(
                    principal_id,
                    filedex_core::types::ChatId(range.chat_id),
                    range.from_id,
                    range.to_id,
                    protect,
                    |_, _| {},
                )
                .await;
            match report {
                Ok(report) => {
                    bot.send_message(
                        chat_id,
                        format!("Sent {} of {} files.", report.success, report.success + report.failed),
                    )
                    .await?;
                }
                Err(e) => {
                    bot.send_message(chat_id, format!("Batch send failed: {e}")).await?;
                }
            }
        }
        ShareLink::BatchLink(batch_id) => {
            match ctx.batch_links.find(&batch_id).await {
                Ok(Some(link)) => {
                    let report = ctx
                        .delivery
                        .send_range(
                            principal_id,
                            filedex_core::types::ChatId(link.source_chat_id),
                            link.from_msg_id,
                            link.to_msg_id,
                            link.protected,
                            |_, _| {},
                        )
                        .await;
                    if let Ok(report) = report {
                        bot.send_message(
                            chat_id,
                            format!("Sent {} of {} files.", report.success, report.success + report.failed),
                        )
                        .await?;
                    }
                }
                Ok(None) => {
                    bot.send_message(chat_id, "This link has expired or does not exist.").await?;
                }
                Err(e) => {
                    bot.send_message(chat_id, format!("Could not resolve that link: {e}")).await?;
                }
            }
        }
        ShareLink::SendAll(session_key) => {
            let report = ctx
                .delivery
                .send_session(principal_id, owner_id, &session_key, &ctx.config.platform, is_admin, |_, _| {})
                .await;
            match report {
                Ok(report) => {
                    bot.send_message(
                        chat_id,
                        format!("Sent {} of {} results.", report.success, report.success + report.failed),
                    )
                    .await?;
                }
                Err(e) => {
                    bot.send_message(chat_id, format!("Could not replay that search: {e}")).await?;
                }
            }
        }
    }
    Ok(())
}

pub async fn stats(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);
    let owner_id = ctx.is_owner(principal_id.0).then_some(principal_id);
    let decision = ctx
        .access
        .can_retrieve(principal_id, owner_id, &ctx.config.platform, ctx.is_admin(principal_id.0))
        .await;

    let text = match decision {
        Ok(d) => match d.reason {
            AccessReason::Unlimited => "Daily limits are currently disabled.".to_string(),
            AccessReason::Owner => "You are the bot owner: unlimited retrievals.".to_string(),
            AccessReason::Admin => "You are an admin: unlimited retrievals.".to_string(),
            AccessReason::Banned(reason) => format!("You are banned: {reason}"),
            AccessReason::PremiumActive { remaining_days } => {
                format!("Premium active, {remaining_days} day(s) remaining.")
            }
            AccessReason::DailyLimitReached => "You've reached today's retrieval limit.".to_string(),
            AccessReason::Allowed { remaining } => format!("{remaining} retrieval(s) left today."),
        },
        Err(e) => format!("Could not load your stats: {e}"),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn plans(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let days = ctx.config.platform.premium_duration_days;
    bot.send_message(
        msg.chat.id,
        format!("Premium grants unlimited daily retrievals for {days} days. Ask an admin to enable it for you."),
    )
    .await?;
    Ok(())
}

pub async fn request_stats(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    match ctx.media.get_file_stats().await {
        Ok(stats) => {
            let by_type = stats
                .by_type
                .iter()
                .map(|t| format!("{}: {}", t.file_type, t.count))
                .collect::<Vec<_>>()
                .join(", ");
            bot.send_message(
                msg.chat.id,
                format!("{} files indexed ({} bytes). By type: {}", stats.total_count, stats.total_size, by_type),
            )
            .await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not load stats: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn my_keywords(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let keywords = ctx.recommendations.my_keywords(PrincipalId(principal.id.0 as i64)).await;
    let text = if keywords.is_empty() {
        "You haven't searched anything recently.".to_string()
    } else {
        keywords.join(", ")
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn popular_keywords(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let keywords = ctx.recommendations.popular_keywords(10).await;
    let text = if keywords.is_empty() {
        "No popular searches yet.".to_string()
    } else {
        keywords.join(", ")
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

pub async fn recommendations(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let recs = ctx
        .recommendations
        .recommendations(PrincipalId(principal.id.0 as i64))
        .await;
    let text = if recs.is_empty() {
        "Nothing to recommend yet — try a few searches first.".to_string()
    } else {
        recs.join(", ")
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
