//! Anonymous Chat Bot - Web Front-End
//!
//! Serves the informational pages on their own, without a Telegram
//! connection.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use anon_chat_bot::config::DEFAULT_WEB_ADDR;

/// Web front-end for the anonymous chat bot.
#[derive(Parser, Debug)]
#[command(name = "anonchat_web")]
#[command(about = "Serve the anonymous chat bot web pages")]
#[command(version)]
struct Args {
    /// Address to bind to.
    #[arg(short, long, default_value = DEFAULT_WEB_ADDR)]
    addr: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    anon_chat_bot::web::serve(&args.addr, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
        }
    })
    .await
    .with_context(|| format!("Web front-end failed on {}", args.addr))
}
