//! Anonymous Chat Bot - Main Entry Point
//!
//! Connects to Telegram as a bot, relays anonymous conversations and serves
//! the informational website next to it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use anon_chat_bot::chat::{ChatState, PersistentState};
use anon_chat_bot::commands::CommandHandler;
use anon_chat_bot::config::{BotSettings, TelegramConfig};
use anon_chat_bot::scheduler::{SchedulerMessage, TimeoutScheduler};
use anon_chat_bot::telegram::TelegramBot;

/// Telegram bot for anonymous one-on-one, topic and group chats.
#[derive(Parser, Debug)]
#[command(name = "anonchat_bot")]
#[command(about = "Anonymous Telegram chat bot")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Do not start the web front-end.
    #[arg(long)]
    no_web: bool,

    /// Web front-end bind address (overrides `WEB_ADDR`).
    #[arg(long)]
    web_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables before settings read them
    let env_loaded = dotenvy::from_filename(&args.env_file);

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(addr) = args.web_addr {
        settings.web_addr = addr;
    }
    init_logging(args.log_level.as_deref().unwrap_or(&settings.log_level));

    if let Err(e) = env_loaded {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    if settings.admin_ids.is_empty() {
        warn!("ADMIN_IDS is empty, admin commands are disabled");
    }

    let persistent = PersistentState::load(&settings.state_path);
    info!(
        "Loaded state from {} ({} banned users, {} banned words)",
        settings.state_path.display(),
        persistent.banned_users.len(),
        persistent.config.banned_words.len()
    );
    let state = Arc::new(RwLock::new(ChatState::from_persistent(persistent)));
    let settings = Arc::new(settings);

    // Connect to Telegram
    let (bot, mut feed) = TelegramBot::connect(&tg_config, settings.min_send_interval_ms)
        .await
        .context("Failed to connect to Telegram")?;
    let bot = Arc::new(bot);
    let bot_username = bot.username().map(str::to_owned);

    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&state),
        Arc::clone(&settings),
        Arc::clone(&bot),
        bot_username,
    ));

    // Spawn the timeout scheduler
    let (scheduler_tx, scheduler_rx) = mpsc::channel::<SchedulerMessage>(32);
    let scheduler = TimeoutScheduler::new(Arc::clone(&bot), Arc::clone(&state))
        .with_check_interval(Duration::from_secs(settings.sweep_interval_secs));
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_rx).await;
    });

    // Spawn the web front-end
    let (web_stop, web_stop_rx) = oneshot::channel::<()>();
    let web_handle = if args.no_web {
        None
    } else {
        let addr = settings.web_addr.clone();
        Some(tokio::spawn(async move {
            let shutdown = async {
                let _ = web_stop_rx.await;
            };
            if let Err(e) = anon_chat_bot::web::serve(&addr, shutdown).await {
                error!("Web front-end failed: {}", e);
            }
        }))
    };

    info!("Bot is running. Use Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            update = feed.next() => {
                match update {
                    Ok(Some(incoming)) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            handler.handle(incoming).await;
                        });
                    }
                    Ok(None) => {
                        warn!("Update stream closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to receive update: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    info!("Shutting down...");
    if let Err(e) = state.read().await.to_persistent().save(&settings.state_path) {
        warn!("Failed to save state: {}", e);
    }
    let _ = scheduler_tx.send(SchedulerMessage::Shutdown).await;
    let _ = scheduler_handle.await;
    let _ = web_stop.send(());
    if let Some(handle) = web_handle {
        let _ = handle.await;
    }
    feed.sync();
    bot.disconnect();

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
