/// Fire-and-forget launching of configured actions.
///
/// The listener thread calls into a [`Launcher`] from inside the WinEvent
/// callback, so implementations must never wait on the spawned child.
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

/// Token in an argument template replaced by the triggering process id.
pub const PID_PLACEHOLDER: &str = "%pid%";

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("action has an empty command name")]
    EmptyCommand,
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait Launcher: Send {
    /// Starts `command` detached. Returns once the child has been created.
    fn spawn(&self, command: &str, args: &[String], hidden: bool) -> Result<(), LaunchError>;
}

/// Substitutes `pid` for every [`PID_PLACEHOLDER`] in `template` and splits the
/// result on whitespace. Quoting is not supported.
pub fn expand_args(template: &str, pid: u32) -> Vec<String> {
    template
        .replace(PID_PLACEHOLDER, &pid.to_string())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Spawns real child processes with all standard streams detached.
#[derive(Default)]
pub struct CommandLauncher;

/// `CREATE_NO_WINDOW` process creation flag.
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Creation flags for a launched action. `hidden` keeps console programs from
/// opening a console window; GUI programs still show their own windows.
#[cfg_attr(not(windows), allow(dead_code))]
fn creation_flags(hidden: bool) -> u32 {
    if hidden {
        CREATE_NO_WINDOW
    } else {
        0
    }
}

impl Launcher for CommandLauncher {
    fn spawn(&self, command: &str, args: &[String], hidden: bool) -> Result<(), LaunchError> {
        if command.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(creation_flags(hidden));
        }
        #[cfg(not(windows))]
        let _ = hidden;

        // The child handle is dropped immediately; it keeps running on its own.
        cmd.spawn().map(drop).map_err(|source| LaunchError::Spawn {
            command: command.to_string(),
            source,
        })
    }
}

/// Logs what would be launched without starting anything (`--dry-run`).
#[derive(Default)]
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    fn spawn(&self, command: &str, args: &[String], hidden: bool) -> Result<(), LaunchError> {
        if command.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        info!(command, ?args, hidden, "dry-run: launch skipped");
        Ok(())
    }
}
