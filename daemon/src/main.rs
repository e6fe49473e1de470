mod classifier;
mod config;
mod deferred;
mod dispatcher;
mod event;
mod inspector;
mod launcher;
mod listener;
mod paths;
mod registry;
mod session;
mod startup;
mod status;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{error, info, warn};

use crate::launcher::{CommandLauncher, DryRunLauncher, Launcher};
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "launchwatch-daemon", version)]
#[command(about = "Runs configured commands when watched applications start, exit or change focus")]
struct Args {
    /// Config file (default: config.toml next to the executable)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log actions instead of starting them
    #[arg(long)]
    dry_run: bool,

    /// Seconds between status file updates
    #[arg(long, default_value_t = 5)]
    status_interval: u64,

    /// Start automatically at Windows login
    #[arg(long)]
    register_startup: bool,

    /// Remove the login registration and exit
    #[arg(long)]
    unregister_startup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => paths::config_file_path()?,
    };
    // Logging is not up yet; parse problems go straight to stderr.
    let config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        eprintln!("[config] Error (using defaults): {e:#}");
        config::Config::default()
    });

    init_tracing(&args.log_level, config.log_path.as_deref())?;
    info!("launchwatch-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Startup registration ──────────────────────────────────────────────────
    if args.unregister_startup {
        return startup::unregister_startup();
    }
    if args.register_startup {
        if let Err(e) = startup::register_startup(args.config.as_deref()) {
            warn!("Startup registration failed: {e:#}");
        }
    }

    let actions = config.action_table();
    info!(
        "Loaded {} configured executable(s) from {}",
        actions.len(),
        config_path.display()
    );

    // ── Session + listener ────────────────────────────────────────────────────
    let launcher: Box<dyn Launcher> = if args.dry_run {
        warn!("Dry-run mode: actions are logged, not started");
        Box::new(DryRunLauncher)
    } else {
        Box::new(CommandLauncher)
    };
    let session = Arc::new(Mutex::new(Session::new(
        actions,
        inspector::platform_inspector(),
        launcher,
    )));

    let listener = listener::start(Arc::clone(&session))
        .context("Failed to subscribe to window events")?;

    // ── Status file ───────────────────────────────────────────────────────────
    let (stop_tx, stop_rx) = watch::channel(false);
    let status_task = tokio::spawn(status::run(
        paths::status_file_path(&config_path),
        Arc::clone(&session),
        status::DaemonStatus::new(&chrono::Local::now().to_rfc3339()),
        Duration::from_secs(args.status_interval.max(1)),
        stop_rx,
    ));

    // ── Shutdown ──────────────────────────────────────────────────────────────
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for Ctrl+C: {e}");
    }
    info!("Shutting down");

    listener.stop();
    let _ = stop_tx.send(true);
    if let Err(e) = status_task.await {
        warn!("Status task ended abnormally: {e}");
    }
    Ok(())
}

/// Logs to stderr, and additionally to `log_file` when configured.
fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // An unusable log file only loses the file copy of the logs.
    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Err(e) => {
                eprintln!("[log] Failed to open log file {}: {e}", path.display());
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
