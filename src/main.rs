//! Giveaway Bot - Main Entry Point
//!
//! Runs the Telegram update loop, the mini-app HTTP API and the
//! completion scheduler side by side.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use giveaway_bot::api::{self, ApiState};
use giveaway_bot::commands::Dispatcher;
use giveaway_bot::config::{BotSettings, TelegramConfig};
use giveaway_bot::eligibility::EligibilityChecker;
use giveaway_bot::registration::RegistrationService;
use giveaway_bot::scheduler::{CompletionScheduler, SchedulerMessage};
use giveaway_bot::store::{GiveawayStore, InMemoryStore, SqliteStore};
use giveaway_bot::telegram::{BotApi, MessagingGateway, UpdatePoller};
use giveaway_bot::wizard::CreationWizard;

/// Telegram bot for channel-subscription giveaways.
#[derive(Parser, Debug)]
#[command(name = "giveaway_bot")]
#[command(about = "Run giveaways gated on Telegram channel subscriptions")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// SQLite database file (overrides `DATABASE_PATH`).
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Keep everything in memory; nothing survives a restart.
    #[arg(long, conflicts_with = "database")]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let mut settings = BotSettings::from_env_with_defaults();
    if let Some(path) = args.database {
        settings.database_path = path;
    }

    let bot = Arc::new(BotApi::new(&tg_config).context("Failed to create Bot API client")?);
    let me = bot
        .get_self()
        .await
        .context("Failed to reach the Bot API (check BOT_TOKEN)")?;
    info!(
        "Authorized as {} (@{})",
        me.first_name,
        me.username.as_deref().unwrap_or("-")
    );

    if args.ephemeral {
        info!("Using in-memory storage, nothing will be persisted");
        run(bot, Arc::new(InMemoryStore::new()), settings).await
    } else {
        let store = SqliteStore::open(&settings.database_path).with_context(|| {
            format!(
                "Failed to open database {}",
                settings.database_path.display()
            )
        })?;
        info!("Using database {}", settings.database_path.display());
        run(bot, Arc::new(store), settings).await
    }
}

/// Wires every component to `store` and runs until Ctrl+C.
async fn run<S: GiveawayStore>(
    bot: Arc<BotApi>,
    store: Arc<S>,
    settings: BotSettings,
) -> Result<()> {
    let checker = Arc::new(EligibilityChecker::new(Arc::clone(&bot)));
    let wizard = Arc::new(CreationWizard::new(
        Arc::clone(&bot),
        Arc::clone(&store),
        Arc::clone(&checker),
        settings.webapp_url.clone(),
        settings.utc_offset(),
    ));
    let registration = Arc::new(RegistrationService::new(Arc::clone(&store), checker));

    // Scheduler
    let (scheduler_tx, scheduler_rx) = mpsc::channel::<SchedulerMessage>(32);
    let scheduler = CompletionScheduler::new(Arc::clone(&bot), Arc::clone(&store))
        .with_check_interval(settings.check_interval());
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_rx).await;
    });

    // Update poller
    let (updates, poller_handle) = UpdatePoller::new(Arc::clone(&bot)).start();

    // HTTP API
    let listener = TcpListener::bind(settings.api_bind)
        .await
        .with_context(|| format!("Failed to bind API server to {}", settings.api_bind))?;
    info!("API listening on {}", settings.api_bind);
    let app = api::router(ApiState {
        gateway: Arc::clone(&bot),
        registration,
    });
    let (server_stop_tx, server_stop_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = server_stop_rx.await;
            })
            .await;
        if let Err(e) = result {
            error!("API server error: {}", e);
        }
    });

    // Dispatcher
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&bot), wizard));
    let dispatcher_handle = tokio::spawn(dispatcher.run(updates));

    info!("Bot is running. Use Ctrl+C to stop.");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, shutting down...");

    let _ = scheduler_tx.send(SchedulerMessage::Shutdown).await;
    let _ = scheduler_handle.await;

    let _ = server_stop_tx.send(());
    let _ = server_handle.await;

    poller_handle.abort();
    dispatcher_handle.abort();

    info!("Shutdown complete");
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
