//! `link`/`plink`/`batch`/`pbatch` — mint a shareable deep link for a
//! message range in the storage channel. `link`/`plink` act on the
//! message being replied to (a single-message range); `batch`/`pbatch`
//! take two `t.me` message links marking the first and last message.

use std::sync::Arc;

use teloxide::prelude::*;

use filedex_core::types::PrincipalId;
use filedex_delivery::{encode_share_link, encode_start_payload, parse_message_link, ShareLink};

use crate::context::Context;

async fn reply_deep_link(bot: &Bot, chat_id: teloxide::types::ChatId, me_username: &str, payload: &str) -> ResponseResult<()> {
    let wrapped = encode_start_payload(payload);
    bot.send_message(chat_id, format!("https://t.me/{me_username}?start={wrapped}")).await?;
    Ok(())
}

async fn make_batch_link(
    ctx: &Context,
    source_chat_id: i64,
    from_msg_id: i64,
    to_msg_id: i64,
    protected: bool,
    created_by: PrincipalId,
) -> filedex_core::error::Result<String> {
    let link = ctx
        .batch_links
        .create_or_reuse(source_chat_id, from_msg_id, to_msg_id, protected, false, created_by, None)
        .await?;
    Ok(encode_share_link(&ShareLink::BatchLink(link.id)))
}

async fn single_message_link(bot: Bot, msg: Message, ctx: Arc<Context>, protected: bool) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);

    let Some(reply) = msg.reply_to_message() else {
        bot.send_message(msg.chat.id, "Reply to the message you want to link.").await?;
        return Ok(());
    };

    let source_chat_id = reply.chat.id.0;
    let msg_id = reply.id.0 as i64;

    match make_batch_link(&ctx, source_chat_id, msg_id, msg_id, protected, principal_id).await {
        Ok(payload) => {
            let me = bot.get_me().await?;
            let username = me.username.as_deref().unwrap_or("this_bot");
            reply_deep_link(&bot, msg.chat.id, username, &payload).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not create link: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn link(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    single_message_link(bot, msg, ctx, false).await
}

pub async fn plink(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    single_message_link(bot, msg, ctx, true).await
}

async fn range_link(bot: Bot, msg: Message, ctx: Arc<Context>, args: String, protected: bool) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);

    let links: Vec<&str> = args.split_whitespace().collect();
    let [first, last] = links[..] else {
        bot.send_message(msg.chat.id, "Usage: /batch <first message link> <last message link>").await?;
        return Ok(());
    };

    let (first_chat, first_msg) = match parse_message_link(first) {
        Ok(v) => v,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Invalid first link: {e}")).await?;
            return Ok(());
        }
    };
    let (last_chat, last_msg) = match parse_message_link(last) {
        Ok(v) => v,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Invalid last link: {e}")).await?;
            return Ok(());
        }
    };

    if first_chat != last_chat {
        bot.send_message(msg.chat.id, "Both links must be from the same chat.").await?;
        return Ok(());
    }
    if last_msg.0 < first_msg.0 {
        bot.send_message(msg.chat.id, "The last link must come after the first.").await?;
        return Ok(());
    }

    match make_batch_link(&ctx, first_chat.0, first_msg.0, last_msg.0, protected, principal_id).await {
        Ok(payload) => {
            let me = bot.get_me().await?;
            let username = me.username.as_deref().unwrap_or("this_bot");
            reply_deep_link(&bot, msg.chat.id, username, &payload).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not create batch link: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn batch(bot: Bot, msg: Message, ctx: Arc<Context>, args: String) -> ResponseResult<()> {
    range_link(bot, msg, ctx, args, false).await
}

pub async fn pbatch(bot: Bot, msg: Message, ctx: Arc<Context>, args: String) -> ResponseResult<()> {
    range_link(bot, msg, ctx, args, true).await
}
