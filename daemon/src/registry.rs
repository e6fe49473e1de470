/// In-memory ledger of tracked windows and the processes that own them.
///
/// A process id is "known" while at least one of its windows is registered.
/// Removing its last window forgets it, so a later window for the same pid is
/// treated as a fresh start.
use std::collections::HashMap;

use crate::event::WindowHandle;

/// A registered window and its owning process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedWindow {
    pub pid: u32,
    /// Lowercase executable filename, e.g. `game.exe`.
    pub exe: String,
}

/// One known process with the number of its windows currently tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedProcess {
    pub pid: u32,
    pub exe: String,
    pub windows: usize,
}

#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: HashMap<WindowHandle, TrackedWindow>,
    /// Per-pid window count; an entry exists only while the count is non-zero.
    window_counts: HashMap<u32, usize>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the owner of `window` if it is tracked.
    pub fn resolve(&self, window: WindowHandle) -> Option<&TrackedWindow> {
        self.windows.get(&window)
    }

    /// Tracks `window` as owned by `pid`.
    ///
    /// Re-registering a handle with the same owner is a no-op. Re-registering
    /// it with a different owner moves it, so a handle never has two owners.
    pub fn register(&mut self, window: WindowHandle, pid: u32, exe: &str) {
        if let Some(existing) = self.windows.get(&window) {
            if existing.pid == pid && existing.exe == exe {
                return;
            }
            self.unregister(window);
        }
        self.windows.insert(
            window,
            TrackedWindow {
                pid,
                exe: exe.to_string(),
            },
        );
        *self.window_counts.entry(pid).or_insert(0) += 1;
    }

    /// Stops tracking `window`, returning the entry that was removed.
    pub fn unregister(&mut self, window: WindowHandle) -> Option<TrackedWindow> {
        let removed = self.windows.remove(&window)?;
        if let Some(count) = self.window_counts.get_mut(&removed.pid) {
            *count -= 1;
            if *count == 0 {
                self.window_counts.remove(&removed.pid);
            }
        }
        Some(removed)
    }

    /// True while `pid` owns at least one tracked window.
    pub fn is_known(&self, pid: u32) -> bool {
        self.window_counts.contains_key(&pid)
    }

    /// Executable recorded for a known `pid`.
    pub fn executable_of(&self, pid: u32) -> Option<&str> {
        self.windows
            .values()
            .find(|w| w.pid == pid)
            .map(|w| w.exe.as_str())
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Known processes ordered by pid.
    pub fn processes(&self) -> Vec<TrackedProcess> {
        let mut out: Vec<TrackedProcess> = self
            .window_counts
            .iter()
            .map(|(&pid, &windows)| TrackedProcess {
                pid,
                exe: self.executable_of(pid).unwrap_or_default().to_string(),
                windows,
            })
            .collect();
        out.sort_by_key(|p| p.pid);
        out
    }
}
