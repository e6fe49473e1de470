use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Root configuration structure. Deserialized from `config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Additional log file. Logs always go to stderr.
    #[serde(default, alias = "logPath")]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub games: Vec<GameConfig>,
}

/// Actions bound to one executable.
#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    /// Executable filename (e.g. "Game.exe"), matched case-insensitively.
    pub exe: String,
    #[serde(default, alias = "OnProcessStart")]
    pub on_process_start: Vec<Action>,
    #[serde(default, alias = "OnProcessFinish")]
    pub on_process_finish: Vec<Action>,
}

/// A configured external command.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Action {
    /// Program to start.
    pub name: String,
    /// Argument template; `%pid%` is replaced by the triggering process id.
    #[serde(default)]
    pub args: String,
    /// Start console programs without a console window. Programs that open
    /// their own GUI windows still show them.
    #[serde(default, alias = "hideWindow")]
    pub hide_window: bool,
    #[serde(default, alias = "onForeground")]
    pub on_foreground: bool,
    /// For finish actions: also run when the app next loses the foreground.
    #[serde(default, alias = "onBackground")]
    pub on_background: bool,
}

/// Start and finish actions for one executable, in configured order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActionSet {
    pub start: Vec<Action>,
    pub finish: Vec<Action>,
}

/// Immutable lookup from lowercase executable filename to its actions.
#[derive(Debug, Default, Clone)]
pub struct ActionTable {
    sets: HashMap<String, ActionSet>,
}

static EMPTY_SET: ActionSet = ActionSet {
    start: Vec::new(),
    finish: Vec::new(),
};

impl ActionTable {
    pub fn new(sets: HashMap<String, ActionSet>) -> Self {
        Self { sets }
    }

    /// Actions for `exe` (already lowercase); empty when not configured.
    pub fn actions_for(&self, exe: &str) -> &ActionSet {
        self.sets.get(exe).unwrap_or(&EMPTY_SET)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }
}

impl Config {
    /// Builds the action lookup. Later entries for the same executable replace
    /// earlier ones; entries without an executable name are skipped.
    pub fn action_table(&self) -> ActionTable {
        let mut sets = HashMap::new();
        for game in &self.games {
            let key = game.exe.trim().to_lowercase();
            if key.is_empty() {
                warn!("Skipping games entry with an empty exe");
                continue;
            }
            if game
                .on_process_start
                .iter()
                .any(|a| a.on_foreground || a.on_background)
            {
                warn!(exe = %key, "on_foreground/on_background have no effect on start actions");
            }
            sets.insert(
                key,
                ActionSet {
                    start: game.on_process_start.clone(),
                    finish: game.on_process_finish.clone(),
                },
            );
        }
        ActionTable::new(sets)
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
