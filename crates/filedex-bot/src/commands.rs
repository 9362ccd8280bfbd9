//! The full command surface, declared as one `teloxide::utils::command`
//! enum so `set_my_commands` and the dispatcher's parser share a single
//! source of truth. Permission tiers (user/admin/owner) are enforced in
//! the handlers, not here — the parser accepts any command from anyone.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", parse_with = "split")]
pub enum Command {
    // --- user surface ---
    #[command(description = "start the bot, or resolve a deep-link payload")]
    Start(String),
    #[command(description = "show available commands")]
    Help,
    #[command(description = "about this bot")]
    About,
    #[command(description = "your retrieval stats")]
    Stats,
    #[command(description = "premium plans")]
    Plans,
    #[command(description = "your request history")]
    RequestStats,
    #[command(description = "keywords you've searched recently")]
    MyKeywords,
    #[command(description = "most popular searches")]
    PopularKeywords,
    #[command(description = "personalized recommendations")]
    Recommendations,

    // --- filter surface (group chats) ---
    #[command(description = "add a keyword auto-reply filter", alias = "filter")]
    Add(String),
    #[command(description = "list this group's filters", alias = "viewfilters")]
    Filters,
    #[command(description = "delete one filter", alias = "deletef")]
    Delf(String),
    #[command(description = "delete every filter in this group", alias = "deleteallf")]
    Delallf,

    // --- connection surface ---
    #[command(description = "connect to a group from a private chat")]
    Connect(String),
    #[command(description = "disconnect from a group")]
    Disconnect(String),
    #[command(description = "list your connected groups")]
    Connections,

    // --- filestore/link surface ---
    #[command(description = "shareable link for the replied-to file")]
    Link,
    #[command(description = "protected shareable link for the replied-to file")]
    Plink,
    #[command(description = "shareable link for a message range")]
    Batch(String),
    #[command(description = "protected shareable link for a message range")]
    Pbatch(String),

    // --- admin surface ---
    #[command(description = "list registered users")]
    Users,
    #[command(description = "broadcast the replied-to message to every user")]
    Broadcast,
    #[command(description = "stop an in-flight broadcast")]
    StopBroadcast,
    #[command(description = "ban a user", parse_with = "split")]
    Ban(i64, String),
    #[command(description = "unban a user")]
    Unban(i64),
    #[command(description = "grant premium")]
    Addpremium(i64),
    #[command(description = "revoke premium")]
    Removepremium(i64),
    #[command(description = "index a channel's message range", parse_with = "split")]
    AddChannel(i64, i64, i64),
    #[command(description = "stop watching a channel")]
    RemoveChannel(i64),
    #[command(description = "list indexed channels")]
    ListChannels,
    #[command(description = "toggle a channel's active watch")]
    ToggleChannel(i64),
    #[command(description = "set the skip-duplicates threshold")]
    Setskip(i64),
    #[command(description = "delete the replied-to file")]
    Delete,
    #[command(description = "bulk delete files matching a keyword")]
    Deleteall(String),
    #[command(description = "tail the admin log")]
    Log,
    #[command(description = "runtime performance snapshot")]
    Performance,
    #[command(description = "cache hit/miss stats")]
    CacheStats,
    #[command(description = "analyze cache key distribution")]
    CacheAnalyze,
    #[command(description = "evict stale cache entries")]
    CacheCleanup,

    // --- owner surface ---
    #[command(description = "get or set a runtime bot setting", parse_with = "split")]
    Bsetting(String, Option<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_NAME: &str = "filedex_bot";

    #[test]
    fn parses_start_with_payload() {
        let cmd = Command::parse("/start abc123", BOT_NAME).unwrap();
        assert!(matches!(cmd, Command::Start(p) if p == "abc123"));
    }

    #[test]
    fn parses_start_without_payload() {
        let cmd = Command::parse("/start", BOT_NAME).unwrap();
        assert!(matches!(cmd, Command::Start(p) if p.is_empty()));
    }

    #[test]
    fn filter_aliases_resolve_to_the_same_variant() {
        let add = Command::parse("/add hello world", BOT_NAME).unwrap();
        let filter = Command::parse("/filter hello world", BOT_NAME).unwrap();
        assert!(matches!(add, Command::Add(a) if a == "hello world"));
        assert!(matches!(filter, Command::Add(a) if a == "hello world"));
    }

    #[test]
    fn ban_splits_target_and_reason() {
        let cmd = Command::parse("/ban 42 spamming", BOT_NAME).unwrap();
        match cmd {
            Command::Ban(target, reason) => {
                assert_eq!(target, 42);
                assert_eq!(reason, "spamming");
            }
            other => panic!("expected Ban, got {other:?}"),
        }
    }

    #[test]
    fn add_channel_splits_three_integers() {
        let cmd = Command::parse("/add_channel -100123 10 210", BOT_NAME).unwrap();
        assert!(matches!(cmd, Command::AddChannel(-100123, 10, 210)));
    }

    #[test]
    fn bsetting_get_has_no_value() {
        let cmd = Command::parse("/bsetting daily_limit", BOT_NAME).unwrap();
        match cmd {
            Command::Bsetting(key, value) => {
                assert_eq!(key, "daily_limit");
                assert_eq!(value, None);
            }
            other => panic!("expected Bsetting, got {other:?}"),
        }
    }

    #[test]
    fn bsetting_set_carries_a_value() {
        let cmd = Command::parse("/bsetting daily_limit 50", BOT_NAME).unwrap();
        match cmd {
            Command::Bsetting(key, value) => {
                assert_eq!(key, "daily_limit");
                assert_eq!(value, Some("50".to_string()));
            }
            other => panic!("expected Bsetting, got {other:?}"),
        }
    }

    #[test]
    fn unknown_command_does_not_parse() {
        assert!(Command::parse("/not_a_real_command", BOT_NAME).is_err());
    }
}
