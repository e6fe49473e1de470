use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::warn;

use crate::session::{Session, SessionSnapshot};

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// Hooks are installed and window events are being handled.
    Listening,
    /// The listener has shut down.
    Stopped,
}

/// A tracked process as written to the status file.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProcessEntry {
    pub pid: u32,
    pub exe: String,
    pub windows: usize,
}

/// Runtime status written by the daemon to `status.toml` for diagnostics.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    pub state: DaemonState,
    /// RFC 3339 timestamp of daemon start.
    pub started_at: String,
    /// RFC 3339 timestamp of this snapshot.
    pub updated_at: String,
    /// Most recently foregrounded tracked executable, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_foreground: Option<String>,
    pub tracked_windows: usize,
    /// Number of finish actions waiting for the next foreground change.
    pub pending_deferred: usize,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
}

impl DaemonStatus {
    /// Constructs the initial status on daemon startup.
    pub fn new(started_at: &str) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Listening,
            started_at: started_at.to_string(),
            updated_at: started_at.to_string(),
            last_foreground: None,
            tracked_windows: 0,
            pending_deferred: 0,
            processes: Vec::new(),
        }
    }

    /// Copies session state into this status and stamps the update time.
    pub fn apply(&mut self, snapshot: SessionSnapshot) {
        self.updated_at = Local::now().to_rfc3339();
        self.last_foreground = snapshot.last_foreground;
        self.tracked_windows = snapshot.tracked_windows;
        self.pending_deferred = snapshot.pending_deferred;
        self.processes = snapshot
            .processes
            .into_iter()
            .map(|p| ProcessEntry {
                pid: p.pid,
                exe: p.exe,
                windows: p.windows,
            })
            .collect();
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking; a status write failure should
/// never crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                warn!("Failed to write status file: {e}");
            }
        }
        Err(e) => warn!("Failed to serialize status: {e}"),
    }
}

fn snapshot(session: &Mutex<Session>) -> SessionSnapshot {
    session
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .snapshot()
}

/// Writes a fresh status every `every` until `stop_rx` flips to `true`, then
/// writes a final `stopped` status.
pub async fn run(
    path: PathBuf,
    session: Arc<Mutex<Session>>,
    mut status: DaemonStatus,
    every: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                status.apply(snapshot(&session));
                write_status(&path, &status);
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    status.apply(snapshot(&session));
    status.state = DaemonState::Stopped;
    write_status(&path, &status);
}
