/// Turns raw WinEvent notifications into process lifecycle transitions.
///
/// Exactly one [`Transition`] is produced per raw event. Unresolvable
/// processes, null handles and non-window objects all classify as
/// [`Transition::Ignored`]; nothing here is an error.
use tracing::{debug, trace};

use crate::event::{RawEvent, RawEventKind, Transition};
use crate::inspector::{executable_file_name, ProcessInspector};
use crate::registry::WindowRegistry;

/// System helper executables that never own an interesting window.
pub const EXCLUDED_EXECUTABLES: &[&str] = &["rundll32.exe"];

pub struct Classifier {
    inspector: Box<dyn ProcessInspector>,
}

impl Classifier {
    pub fn new(inspector: Box<dyn ProcessInspector>) -> Self {
        Self { inspector }
    }

    /// Classifies `event`, registering or unregistering windows in `registry`
    /// as a side effect. `last_foreground` suppresses repeated foreground
    /// notifications for the executable that already has focus.
    pub fn classify(
        &mut self,
        registry: &mut WindowRegistry,
        last_foreground: Option<&str>,
        event: &RawEvent,
    ) -> Transition {
        if !event.targets_window() {
            return Transition::Ignored;
        }

        if let Some(tracked) = registry.resolve(event.window) {
            let (pid, exe) = (tracked.pid, tracked.exe.clone());
            return match event.kind {
                RawEventKind::ObjectDestroyed => {
                    registry.unregister(event.window);
                    if registry.is_known(pid) {
                        trace!(pid, exe = %exe, "window destroyed; process still has windows");
                        Transition::Ignored
                    } else {
                        Transition::ProcessFinished { pid, exe }
                    }
                }
                RawEventKind::ForegroundChanged => foreground(exe, pid, last_foreground),
                RawEventKind::ObjectCreated => Transition::Ignored,
            };
        }

        if event.window.is_null() || event.kind == RawEventKind::ObjectDestroyed {
            return Transition::Ignored;
        }

        let Some(pid) = event.owner_pid.filter(|&pid| pid != 0) else {
            return Transition::Ignored;
        };

        let exe = if registry.is_known(pid) {
            // Another window of this process was already seen on creation.
            if event.kind == RawEventKind::ObjectCreated {
                return Transition::Ignored;
            }
            match registry.executable_of(pid) {
                Some(exe) => exe.to_string(),
                None => return Transition::Ignored,
            }
        } else {
            match self.inspector.executable_path(pid) {
                Ok(path) => executable_file_name(&path.to_string_lossy()),
                Err(e) => {
                    debug!(pid, "ignoring window: {e}");
                    return Transition::Ignored;
                }
            }
        };

        if EXCLUDED_EXECUTABLES.contains(&exe.as_str()) {
            return Transition::Ignored;
        }

        registry.register(event.window, pid, &exe);

        match event.kind {
            RawEventKind::ForegroundChanged => foreground(exe, pid, last_foreground),
            _ => Transition::ProcessStarted { pid, exe },
        }
    }
}

fn foreground(exe: String, pid: u32, last_foreground: Option<&str>) -> Transition {
    if last_foreground == Some(exe.as_str()) {
        Transition::Ignored
    } else {
        Transition::ForegroundChanged { exe, pid }
    }
}
