//! Wires `Command` variants and plain updates to their handlers, with
//! permission tiers enforced via `dptree::filter` guards before a handler
//! ever runs.

use std::sync::Arc;

use teloxide::dispatching::{Dispatcher, UpdateFilterExt, UpdateHandler};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::commands::Command;
use crate::context::Context;
use crate::handlers::{admin, connection, filestore, filter, ingest, search, user};

fn is_admin(ctx: Arc<Context>, msg: Message) -> bool {
    msg.from().is_some_and(|u| ctx.is_admin(u.id.0 as i64))
}

fn is_owner(ctx: Arc<Context>, msg: Message) -> bool {
    msg.from().is_some_and(|u| ctx.is_owner(u.id.0 as i64))
}

fn command_tree() -> UpdateHandler<teloxide::RequestError> {
    let user_commands = Update::filter_message()
        .filter_command::<Command>()
        .branch(dptree::case![Command::Start(payload)].endpoint(user::start))
        .branch(dptree::case![Command::Help].endpoint(user::help))
        .branch(dptree::case![Command::About].endpoint(user::about))
        .branch(dptree::case![Command::Stats].endpoint(user::stats))
        .branch(dptree::case![Command::Plans].endpoint(user::plans))
        .branch(dptree::case![Command::RequestStats].endpoint(user::request_stats))
        .branch(dptree::case![Command::MyKeywords].endpoint(user::my_keywords))
        .branch(dptree::case![Command::PopularKeywords].endpoint(user::popular_keywords))
        .branch(dptree::case![Command::Recommendations].endpoint(user::recommendations))
        .branch(dptree::case![Command::Add(args)].endpoint(filter::add))
        .branch(dptree::case![Command::Filters].endpoint(filter::list))
        .branch(dptree::case![Command::Delf(text)].endpoint(filter::delete_one))
        .branch(dptree::case![Command::Delallf].endpoint(filter::delete_all))
        .branch(dptree::case![Command::Connect(arg)].endpoint(connection::connect))
        .branch(dptree::case![Command::Disconnect(arg)].endpoint(connection::disconnect))
        .branch(dptree::case![Command::Connections].endpoint(connection::connections))
        .branch(dptree::case![Command::Link].endpoint(filestore::link))
        .branch(dptree::case![Command::Plink].endpoint(filestore::plink))
        .branch(dptree::case![Command::Batch(args)].endpoint(filestore::batch))
        .branch(dptree::case![Command::Pbatch(args)].endpoint(filestore::pbatch));

    let admin_commands = Update::filter_message()
        .filter_command::<Command>()
        .filter(|ctx: Arc<Context>, msg: Message| is_admin(ctx, msg))
        .branch(dptree::case![Command::Users].endpoint(admin::users))
        .branch(dptree::case![Command::Broadcast].endpoint(admin::broadcast))
        .branch(dptree::case![Command::StopBroadcast].endpoint(admin::stop_broadcast))
        .branch(dptree::case![Command::Ban(target, reason)].endpoint(admin::ban))
        .branch(dptree::case![Command::Unban(target)].endpoint(admin::unban))
        .branch(dptree::case![Command::Addpremium(target)].endpoint(admin::add_premium))
        .branch(dptree::case![Command::Removepremium(target)].endpoint(admin::remove_premium))
        .branch(dptree::case![Command::AddChannel(channel_id, from, to)].endpoint(admin::add_channel))
        .branch(dptree::case![Command::RemoveChannel(channel_id)].endpoint(admin::remove_channel))
        .branch(dptree::case![Command::ListChannels].endpoint(admin::list_channels))
        .branch(dptree::case![Command::ToggleChannel(channel_id)].endpoint(admin::toggle_channel))
        .branch(dptree::case![Command::Setskip(channel_id)].endpoint(admin::setskip))
        .branch(dptree::case![Command::Delete].endpoint(admin::delete))
        .branch(dptree::case![Command::Deleteall(keyword)].endpoint(admin::deleteall))
        .branch(dptree::case![Command::Log].endpoint(admin::log))
        .branch(dptree::case![Command::Performance].endpoint(admin::performance))
        .branch(dptree::case![Command::CacheStats].endpoint(admin::cache_stats))
        .branch(dptree::case![Command::CacheAnalyze].endpoint(admin::cache_analyze))
        .branch(dptree::case![Command::CacheCleanup].endpoint(admin::cache_cleanup));

    let owner_commands = Update::filter_message()
        .filter_command::<Command>()
        .filter(|ctx: Arc<Context>, msg: Message| is_owner(ctx, msg))
        .branch(dptree::case![Command::Bsetting(key, value)].endpoint(admin::bsetting));

    let filter_reply = Update::filter_message()
        .filter(|msg: Message| !msg.chat.is_private())
        .endpoint(filter::maybe_reply);
    let free_text_search = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(search::on_text);
    let callbacks = Update::filter_callback_query().endpoint(search::on_page_turn);
    let channel_ingest = Update::filter_channel_post().endpoint(ingest::on_channel_post);

    dptree::entry()
        .branch(user_commands)
        .branch(admin_commands)
        .branch(owner_commands)
        .branch(channel_ingest)
        .branch(filter_reply)
        .branch(free_text_search)
        .branch(callbacks)
}

pub async fn run(bot: Bot, ctx: Arc<Context>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "failed to register bot command list");
    }

    Dispatcher::builder(bot, command_tree())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
