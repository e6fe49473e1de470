/// Runs configured actions for each lifecycle transition.
///
/// Launch failures are logged and never stop the remaining actions.
use tracing::{info, warn};

use crate::config::{Action, ActionTable};
use crate::deferred::DeferredQueue;
use crate::event::Transition;
use crate::launcher::{expand_args, Launcher};

pub struct Dispatcher {
    actions: ActionTable,
    launcher: Box<dyn Launcher>,
    deferred: DeferredQueue,
    last_foreground: Option<String>,
}

impl Dispatcher {
    pub fn new(actions: ActionTable, launcher: Box<dyn Launcher>) -> Self {
        Self {
            actions,
            launcher,
            deferred: DeferredQueue::new(),
            last_foreground: None,
        }
    }

    /// Most recently foregrounded tracked executable.
    pub fn last_foreground(&self) -> Option<&str> {
        self.last_foreground.as_deref()
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    pub fn dispatch(&mut self, transition: &Transition) {
        match transition {
            Transition::ProcessStarted { pid, exe } => self.on_process_started(*pid, exe),
            Transition::ProcessFinished { pid, exe } => self.on_process_finished(*pid, exe),
            Transition::ForegroundChanged { exe, pid } => self.on_foreground_changed(exe, *pid),
            Transition::Ignored => {}
        }
    }

    pub fn on_process_started(&mut self, pid: u32, exe: &str) {
        info!(pid, exe, "process started");
        let set = self.actions.actions_for(exe);
        run_all(self.launcher.as_ref(), pid, &set.start);
    }

    /// Runs every finish action, whatever its qualifiers.
    pub fn on_process_finished(&mut self, pid: u32, exe: &str) {
        info!(pid, exe, "process finished");
        let set = self.actions.actions_for(exe);
        run_all(self.launcher.as_ref(), pid, &set.finish);
    }

    /// Runs the actions deferred by the previous foreground app with the newly
    /// focused `pid`, then defers this app's `on_background` finish actions
    /// until focus moves again.
    pub fn on_foreground_changed(&mut self, exe: &str, pid: u32) {
        info!(pid, exe, "foreground changed");

        if let Some(batch) = self.deferred.drain() {
            info!(
                pid,
                deferred_by = %batch.exe,
                count = batch.actions.len(),
                "running deferred actions"
            );
            run_all(self.launcher.as_ref(), pid, &batch.actions);
        }

        let background: Vec<Action> = self
            .actions
            .actions_for(exe)
            .finish
            .iter()
            .filter(|a| a.on_background)
            .cloned()
            .collect();
        self.deferred.replace(exe, background);

        self.last_foreground = Some(exe.to_string());
    }
}

fn run_all(launcher: &dyn Launcher, pid: u32, actions: &[Action]) {
    for action in actions {
        let args = expand_args(&action.args, pid);
        info!(command = %action.name, ?args, hidden = action.hide_window, "launching");
        if let Err(e) = launcher.spawn(&action.name, &args, action.hide_window) {
            warn!("Launch failed: {e}");
        }
    }
}
