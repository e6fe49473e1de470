/// Canonical file locations.
///
/// By default both files live next to the daemon executable:
///   - config.toml  Written by the user, read once at startup.
///   - status.toml  Written periodically by the daemon for diagnostics.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Directory containing the running executable.
pub fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate daemon executable")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("Daemon executable has no parent directory")
}

/// Default config file: `<executable dir>\config.toml`.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(executable_dir()?.join(CONFIG_FILE_NAME))
}

/// Status file written alongside whichever config file is in use.
pub fn status_file_path(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(dir) => dir.join(STATUS_FILE_NAME),
        None => PathBuf::from(STATUS_FILE_NAME),
    }
}
