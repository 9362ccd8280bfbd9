//! Admin/owner command surface: user management, broadcast control,
//! channel indexing, deletion, settings, and cache/log introspection.
//! Every handler here assumes its caller has already passed the
//! `ctx.is_admin`/`ctx.is_owner` gate in `dispatch.rs`.

use std::sync::Arc;

use teloxide::prelude::*;

use filedex_core::types::{ChatId, MessageId, PrincipalId};
use filedex_deletion::DeletionItem;

use crate::context::Context;

pub async fn users(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    match ctx.access.get_banned().await {
        Ok(banned) => {
            bot.send_message(msg.chat.id, format!("{} banned user(s) on file.", banned.len())).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not load users: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn broadcast(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(reply) = msg.reply_to_message() else {
        bot.send_message(msg.chat.id, "Reply to the message you want to broadcast.").await?;
        return Ok(());
    };

    {
        let guard = ctx.broadcast_cancel.lock().await;
        if guard.is_some() {
            bot.send_message(msg.chat.id, "A broadcast is already running. Use /stop_broadcast first.").await?;
            return Ok(());
        }
    }

    let (tx, rx) = tokio::sync::watch::channel(false);
    *ctx.broadcast_cancel.lock().await = Some(tx);

    let source_chat = ChatId(reply.chat.id.0);
    let message_id = MessageId(reply.id.0 as i64);
    let chat_id = msg.chat.id;
    let bot_for_task = bot.clone();
    let ctx_for_task = ctx.clone();

    tokio::spawn(async move {
        let report = ctx_for_task.broadcast.run(source_chat, message_id, rx, |_| {}).await;
        *ctx_for_task.broadcast_cancel.lock().await = None;
        let text = match report {
            Ok(r) => format!(
                "Broadcast complete: {} sent, {} blocked, {} deleted, {} failed (of {}).",
                r.succeeded, r.blocked, r.deleted, r.failed, r.total
            ),
            Err(e) => format!("Broadcast failed: {e}"),
        };
        let _ = bot_for_task.send_message(chat_id, text).await;
    });

    bot.send_message(msg.chat.id, "Broadcast started.").await?;
    Ok(())
}

pub async fn stop_broadcast(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let guard = ctx.broadcast_cancel.lock().await;
    match guard.as_ref() {
        Some(tx) => {
            let _ = tx.send(true);
            bot.send_message(msg.chat.id, "Stopping the broadcast after the current page.").await?;
        }
        None => {
            bot.send_message(msg.chat.id, "No broadcast is running.").await?;
        }
    }
    Ok(())
}

pub async fn ban(bot: Bot, msg: Message, ctx: Arc<Context>, target: i64, reason: String) -> ResponseResult<()> {
    match ctx.access.ban(PrincipalId(target), &reason).await {
        Ok(()) => {
            ctx.cache_invalidator.invalidate_principal(target).await;
            ctx.cache_invalidator.invalidate_banned_list().await;
            bot.send_message(msg.chat.id, format!("Banned {target}.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not ban {target}: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn unban(bot: Bot, msg: Message, ctx: Arc<Context>, target: i64) -> ResponseResult<()> {
    match ctx.access.unban(PrincipalId(target)).await {
        Ok(()) => {
            ctx.cache_invalidator.invalidate_principal(target).await;
            ctx.cache_invalidator.invalidate_banned_list().await;
            bot.send_message(msg.chat.id, format!("Unbanned {target}.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not unban {target}: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn add_premium(bot: Bot, msg: Message, ctx: Arc<Context>, target: i64) -> ResponseResult<()> {
    match ctx.access.set_premium(PrincipalId(target), true).await {
        Ok(()) => {
            ctx.cache_invalidator.invalidate_principal(target).await;
            bot.send_message(msg.chat.id, format!("Premium enabled for {target}.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not enable premium: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn remove_premium(bot: Bot, msg: Message, ctx: Arc<Context>, target: i64) -> ResponseResult<()> {
    match ctx.access.set_premium(PrincipalId(target), false).await {
        Ok(()) => {
            ctx.cache_invalidator.invalidate_principal(target).await;
            bot.send_message(msg.chat.id, format!("Premium removed for {target}.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not remove premium: {e}")).await?;
        }
    }
    Ok(())
}

/// Registers a channel for live-watch indexing. `from_msg_id`/`to_msg_id`
/// describe a historic backfill range; the bot can only report the slice
/// plan for it (`PlatformClient` has no bot-API-backed way to fetch
/// arbitrary historic message content — only new messages as they arrive
/// can be indexed), so a non-empty range is acknowledged, not executed.
pub async fn add_channel(
    bot: Bot,
    msg: Message,
    ctx: Arc<Context>,
    channel_id: i64,
    from_msg_id: i64,
    to_msg_id: i64,
) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    match ctx.channels.add_channel(channel_id, None, None, principal.id.0 as i64).await {
        Ok(channel) => {
            let mut text = format!("Now watching channel {}.", channel.channel_id);
            if to_msg_id > from_msg_id {
                let slices = filedex_ingest::slice_range(from_msg_id, to_msg_id);
                text.push_str(&format!(
                    " Historic range {from_msg_id}-{to_msg_id} would need {} backfill slice(s); \
                     only new messages are indexed automatically.",
                    slices.len()
                ));
            }
            bot.send_message(msg.chat.id, text).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not add channel: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn remove_channel(bot: Bot, msg: Message, ctx: Arc<Context>, channel_id: i64) -> ResponseResult<()> {
    match ctx.channels.remove_channel(channel_id).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, "Channel removed.").await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, "That channel wasn't being watched.").await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not remove channel: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn list_channels(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    match ctx.channels.list_channels().await {
        Ok(channels) if channels.is_empty() => {
            bot.send_message(msg.chat.id, "No channels are being watched.").await?;
        }
        Ok(channels) => {
            let list = channels
                .iter()
                .map(|c| {
                    let name = c.title.as_deref().unwrap_or("(untitled)");
                    let state = if c.enabled { "on" } else { "off" };
                    format!("- {} [{}] {} indexed, {}", c.channel_id, state, c.indexed_count, name)
                })
                .collect::<Vec<_>>()
                .join("\n");
            bot.send_message(msg.chat.id, list).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not list channels: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn toggle_channel(bot: Bot, msg: Message, ctx: Arc<Context>, channel_id: i64) -> ResponseResult<()> {
    match ctx.channels.toggle(channel_id).await {
        Ok(enabled) => {
            let state = if enabled { "enabled" } else { "disabled" };
            bot.send_message(msg.chat.id, format!("Channel {channel_id} {state}.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not toggle channel: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn setskip(bot: Bot, msg: Message, ctx: Arc<Context>, _channel_id: i64) -> ResponseResult<()> {
    ctx.ingest_queue.notify_reconcile();
    bot.send_message(msg.chat.id, "Nudged the ingest reconciler to pick up any pending backlog now.").await?;
    Ok(())
}

pub async fn delete(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(reply) = msg.reply_to_message() else {
        bot.send_message(msg.chat.id, "Reply to an indexed message to delete it.").await?;
        return Ok(());
    };
    let Some(file_unique_id) = reply
        .document()
        .map(|d| d.file.unique_id.clone())
        .or_else(|| reply.video().map(|v| v.file.unique_id.clone()))
        .or_else(|| reply.audio().map(|a| a.file.unique_id.clone()))
    else {
        bot.send_message(msg.chat.id, "That message has no indexed media.").await?;
        return Ok(());
    };

    ctx.deletion_queue.enqueue(DeletionItem::ByUniqueId(file_unique_id)).await;
    bot.send_message(msg.chat.id, "Queued for deletion.").await?;
    Ok(())
}

pub async fn deleteall(bot: Bot, msg: Message, ctx: Arc<Context>, keyword: String) -> ResponseResult<()> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /deleteall <keyword>").await?;
        return Ok(());
    }
    ctx.deletion_queue.enqueue(DeletionItem::ByKeyword(keyword.to_string())).await;
    bot.send_message(msg.chat.id, format!("Queued deletion of all files matching '{keyword}'.")).await?;
    Ok(())
}

pub async fn log(bot: Bot, msg: Message, _ctx: Arc<Context>) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, "Live log tailing isn't exposed over chat; check the process log stream.")
        .await?;
    Ok(())
}

pub async fn performance(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let overflow = ctx.ingest_queue.overflow_len();
    bot.send_message(msg.chat.id, format!("Ingest overflow queue depth: {overflow}.")).await?;
    Ok(())
}

pub async fn cache_stats(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let version = ctx.cache_invalidator.search_version().await;
    bot.send_message(msg.chat.id, format!("Search cache version: {version}.")).await?;
    Ok(())
}

pub async fn cache_analyze(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let ttl = ctx.cache.ttl("search:version").await;
    bot.send_message(msg.chat.id, format!("search:version ttl: {ttl}s (-1 means no expiry set).")).await?;
    Ok(())
}

pub async fn cache_cleanup(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let removed = ctx.cache.delete_pattern("media:*").await + ctx.cache.delete_pattern("search:*").await;
    bot.send_message(msg.chat.id, format!("Removed {removed} stale cache key(s).")).await?;
    Ok(())
}

pub async fn bsetting(bot: Bot, msg: Message, ctx: Arc<Context>, key: String, value: Option<String>) -> ResponseResult<()> {
    match value {
        None => match ctx.settings.get(&key).await {
            Ok(Some(setting)) => {
                bot.send_message(msg.chat.id, format!("{} = {}", setting.key, setting.value)).await?;
            }
            Ok(None) => {
                bot.send_message(msg.chat.id, format!("No such setting: {key}")).await?;
            }
            Err(e) => {
                bot.send_message(msg.chat.id, format!("Could not read setting: {e}")).await?;
            }
        },
        Some(value) => match ctx.settings.set(&key, &value, "string").await {
            Ok(()) => {
                bot.send_message(msg.chat.id, format!("{key} set to {value}.")).await?;
            }
            Err(e) => {
                bot.send_message(msg.chat.id, format!("Could not set {key}: {e}")).await?;
            }
        },
    }
    Ok(())
}
