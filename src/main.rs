mod bot;
mod config;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatKind, ChatMemberStatus, ChatMemberUpdated};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use bot::telegram::{roster_entry, to_incoming};
use bot::{ChatClient, CommandDispatcher, Roster, TelegramClient};
use config::Config;

struct BotState {
    config: Config,
    roster: Arc<Roster>,
    dispatcher: Arc<CommandDispatcher>,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tagbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let (non_blocking, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "tagbot.log"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("Starting tagbot...");
    info!("Loaded config from {config_path}");
    info!("Super admins: {:?}", config.bot.super_admins);
    info!(
        "Tag batches: {} mentions, {:?} apart",
        config.bot.batch_size, config.bot.batch_delay
    );
    if config.dry_run {
        info!("DRY RUN mode enabled");
    }

    let roster = match Roster::open(&config.data_dir.join("roster.db")) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("Failed to open roster database: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    match bot.get_me().await {
        Ok(me) => info!("Bot user ID: {}, username: @{}", me.id, me.username()),
        Err(e) => warn!("Failed to get bot info: {e}"),
    }

    let client: Arc<dyn ChatClient> =
        Arc::new(TelegramClient::new(bot.clone(), roster.clone(), config.dry_run));
    let dispatcher = Arc::new(CommandDispatcher::new(client, config.bot.clone()));
    let state = Arc::new(BotState { config, roster, dispatcher });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_new_message))
        .branch(Update::filter_chat_member().endpoint(handle_chat_member));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shut down");
}

async fn handle_new_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let is_group = matches!(msg.chat.kind, ChatKind::Public(_));

    if is_group {
        if !state.config.is_allowed_group(msg.chat.id) {
            return Ok(());
        }
        if let Some(ref user) = msg.from
            && !user.is_bot
            && let Err(e) = state.roster.record_seen(msg.chat.id.0, &roster_entry(user))
        {
            warn!("Failed to record {} in chat {}: {e}", user.id, msg.chat.id);
        }
    }

    let Some(incoming) = to_incoming(&msg) else {
        return Ok(());
    };

    // Tag-all may sleep between batches; keep it off the update loop.
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.handle_incoming_message(incoming).await;
    });

    Ok(())
}

async fn handle_chat_member(update: ChatMemberUpdated, state: Arc<BotState>) -> ResponseResult<()> {
    if !state.config.is_allowed_group(update.chat.id) {
        return Ok(());
    }

    let user = &update.new_chat_member.user;
    if user.is_bot {
        return Ok(());
    }
    let chat_id = update.chat.id.0;

    let result = match update.new_chat_member.status() {
        ChatMemberStatus::Member | ChatMemberStatus::Administrator | ChatMemberStatus::Owner => {
            info!("👋 Member joined: {} ({})", user.first_name, user.id);
            state.roster.record_seen(chat_id, &roster_entry(user))
        }
        ChatMemberStatus::Left => {
            info!("👋 Member left: {} ({})", user.first_name, user.id);
            state.roster.mark_gone(chat_id, user.id.0 as i64, "left")
        }
        ChatMemberStatus::Banned => {
            info!("🚫 Member banned: {} ({})", user.first_name, user.id);
            state.roster.mark_gone(chat_id, user.id.0 as i64, "banned")
        }
        _ => Ok(()),
    };

    if let Err(e) = result {
        warn!("Failed to update roster for chat {chat_id}: {e}");
    }

    Ok(())
}
