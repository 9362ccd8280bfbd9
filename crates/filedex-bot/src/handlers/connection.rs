//! `connect`/`disconnect`/`connections` — lets a principal point their
//! private-chat searches at a group's index without leaving that group.

use std::sync::Arc;

use teloxide::prelude::*;

use filedex_core::types::{ChatId, PrincipalId};

use crate::context::Context;

fn parse_group_id(arg: &str) -> Option<ChatId> {
    arg.trim().parse::<i64>().ok().map(ChatId)
}

pub async fn connect(bot: Bot, msg: Message, ctx: Arc<Context>, arg: String) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);

    let Some(group_id) = parse_group_id(&arg) else {
        bot.send_message(msg.chat.id, "Usage: /connect <group id>").await?;
        return Ok(());
    };

    match ctx.connections.connect(principal_id, group_id).await {
        Ok(_) => {
            bot.send_message(msg.chat.id, format!("Connected to group {}.", group_id.0)).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not connect: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn disconnect(bot: Bot, msg: Message, ctx: Arc<Context>, arg: String) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);

    let Some(group_id) = parse_group_id(&arg) else {
        bot.send_message(msg.chat.id, "Usage: /disconnect <group id>").await?;
        return Ok(());
    };

    match ctx.connections.disconnect(principal_id, group_id).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, "Disconnected.").await?;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, "You weren't connected to that group.").await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not disconnect: {e}")).await?;
        }
    }
    Ok(())
}

pub async fn connections(bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(principal) = msg.from() else { return Ok(()) };
    let principal_id = PrincipalId(principal.id.0 as i64);

    let groups = ctx.connections.list_groups(principal_id).await;
    let active = ctx.connections.active_group(principal_id).await.ok().flatten();

    match groups {
        Ok(groups) if groups.is_empty() => {
            bot.send_message(msg.chat.id, "You're not connected to any group.").await?;
        }
        Ok(groups) => {
            let list = groups
                .iter()
                .map(|g| {
                    if Some(*g) == active {
                        format!("- {} (active)", g.0)
                    } else {
                        format!("- {}", g.0)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            bot.send_message(msg.chat.id, list).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Could not list connections: {e}")).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_group_id() {
        assert_eq!(parse_group_id("-1001234567890"), Some(ChatId(-1001234567890)));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_group_id("  42  "), Some(ChatId(42)));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert_eq!(parse_group_id("not-a-number"), None);
        assert_eq!(parse_group_id(""), None);
    }
}
