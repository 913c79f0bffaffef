#![forbid(unsafe_code)]

//! `contribute-relay` binary.
//!
//! Loads configuration, starts the engine under supervision, and runs the
//! session owner until a shutdown signal arrives or the engine dies.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use contribute_relay::config::RelayConfig;
use contribute_relay::display::TracingPresenter;
use contribute_relay::engine::command::EngineCommand;
use contribute_relay::engine::supervisor::EngineSupervisor;
use contribute_relay::game::AnalysisScorer;
use contribute_relay::sessions::{spawn_session_owner, Curator, SessionOwner, SessionStore};
use contribute_relay::sgf::writer::FileSgfWriter;
use contribute_relay::{AppError, Result};

/// Bound on queued engine events between the readers and the session owner.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "contribute-relay", about = "Relay and replay KataGo contribute games", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the contributing username from the configuration file.
    #[arg(long)]
    username: Option<String>,
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("contribute-relay bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<ExitCode> {
    let mut config = RelayConfig::load_from_path(&args.config)?;
    if let Some(username) = args.username {
        if username.trim().is_empty() {
            return Err(AppError::Config("username must not be empty".into()));
        }
        config.username = username;
    }
    info!(
        username = %config.username,
        games = config.max_simultaneous_games,
        "configuration loaded"
    );

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let engine_down = CancellationToken::new();
    let owner_cancel = CancellationToken::new();

    // One slot above the occupancy limit, so the buffer can overflow and
    // trigger fast-forwarding.
    let store = SessionStore::with_capacity(config.curator.max_buffer_games.saturating_add(1));
    let curator = Curator::from_config(&config, Box::new(AnalysisScorer), Arc::new(FileSgfWriter));
    let owner = SessionOwner::new(
        store,
        curator,
        Arc::new(TracingPresenter),
        engine_down.clone(),
    );
    let owner_handle = spawn_session_owner(
        owner,
        event_rx,
        config.curator.tick_interval(),
        owner_cancel.clone(),
    );

    let mut supervisor =
        EngineSupervisor::new(EngineCommand::from_config(&config), config.shutdown_grace());
    // The supervisor has already logged the failure.
    if supervisor.start(event_tx).is_err() {
        owner_cancel.cancel();
        if let Err(join_err) = owner_handle.await {
            warn!(%join_err, "session owner task failed");
        }
        return Ok(ExitCode::FAILURE);
    }

    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        () = engine_down.cancelled() => warn!("engine stopped, shutting down"),
    }

    supervisor.shutdown().await;
    owner_cancel.cancel();
    match owner_handle.await {
        Ok(owner) => info!(
            finished = owner.store().finished_count(),
            "session owner stopped"
        ),
        Err(err) => error!(%err, "session owner task failed"),
    }
    info!("contribute-relay shut down");

    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
