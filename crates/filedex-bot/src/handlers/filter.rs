//! `add`/`filter`, `filters`/`viewfilters`, `delf`/`deletef`,
//! `delallf`/`deleteallf` — per-group keyword auto-reply rules. Group
//! admin status is enforced by the platform (only chat admins can run
//! these in a group); this layer just persists and matches.

use std::sync::Arc;

use teloxide::prelude::*;

use filedex_core::types::ChatId;

use crate::context::Context;

fn parse_add_args(args: &str) -> Option<(String, String)> {
    let mut parts = args.splitn(2, char::is_whitespace);
    let text = parts.next()?.trim();
    let reply = parts.next()?.trim();
    if text.is_empty() || reply.is_empty() {
        return None;
    }
    Some((text.to_string(), reply.to_string()))
}

pub async fn add(bot: Bot, msg: Message, ctx: Arc<Context>, args: String) -> ResponseResult<()> {
    if msg.chat.is_private() {
        bot.send_message(msg.chat.id, "Filters can only be added in groups.").await?;
        return Ok(());
    }

    let Some((text, reply)) = parse_add_args(&args) else {
        bot.send_message(msg.chat.id, "Usage: /add <keyword> <reply text>").await?;
        return Ok(());
    };

    let group_id = ChatId(msg.chat.id.0);
    match ctx.filters.add_filter(group_id, &text, &reply, None, None, None).await {
        Ok(_) => {
            bot.send_message(msg.chat.id, format!("Filter '{text}' saved.")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not save filter: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn list(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let group_id = ChatId(msg.chat.id.0);
    match ctx.filters.list_filters(group_id).await {
        Ok(filters) if filters.is_empty() => {
            bot.send_message(msg.chat.id, "No filters set in this group.").await?;
        }
        Ok(filters) => {
            let list = filters.iter().map(|f| format!("- {}", f.text)).collect::<Vec<_>>().join("\n");
            bot.send_message(msg.chat.id, list).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not list filters: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn delete_one(bot: Bot, msg: Message, ctx: Arc<Context>, text: String) -> ResponseResult<()> {
    let group_id = ChatId(msg.chat.id.0);
    match ctx.filters.delete_filter(group_id, text.trim()).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, "Filter deleted.").await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, "No such filter.").await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not delete filter: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn delete_all(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let group_id = ChatId(msg.chat.id.0);
    match ctx.filters.delete_all_filters(group_id).await {
        Ok(n) => {
            bot.send_message(msg.chat.id, format!("Deleted {n} filter(s).")).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not delete filters: {e}")).await?;
        }
    }
    Ok(())
}

/// Checks an incoming group text message against the group's filters and
/// replies with the matching filter's text, if any. Wired as a plain
/// message handler alongside command dispatch, not a command itself.
pub async fn maybe_reply(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    if msg.chat.is_private() {
        return Ok(());
    }
    let Some(text) = msg.text() else { return Ok(()) };
    let group_id = ChatId(msg.chat.id.0);

    if let Ok(Some(filter)) = ctx.filters.find_matching(group_id, text).await {
        bot.send_message(msg.chat.id, filter.reply).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_whitespace_run() {
        assert_eq!(
            parse_add_args("hello   world of filters"),
            Some(("hello".to_string(), "world of filters".to_string()))
        );
    }

    #[test]
    fn rejects_missing_reply() {
        assert_eq!(parse_add_args("hello"), None);
        assert_eq!(parse_add_args("hello   "), None);
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse_add_args(""), None);
    }
}
