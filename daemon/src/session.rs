/// One listener's complete state: window registry, classifier and dispatcher.
///
/// The listener thread owns the only writer; the status task takes the same
/// lock briefly to read a [`SessionSnapshot`].
use crate::classifier::Classifier;
use crate::config::ActionTable;
use crate::dispatcher::Dispatcher;
use crate::event::{RawEvent, Transition};
use crate::inspector::ProcessInspector;
use crate::launcher::Launcher;
use crate::registry::{TrackedProcess, WindowRegistry};

/// Point-in-time view of a session for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub last_foreground: Option<String>,
    pub tracked_windows: usize,
    pub processes: Vec<TrackedProcess>,
    pub pending_deferred: usize,
}

pub struct Session {
    registry: WindowRegistry,
    classifier: Classifier,
    dispatcher: Dispatcher,
}

impl Session {
    pub fn new(
        actions: ActionTable,
        inspector: Box<dyn ProcessInspector>,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            registry: WindowRegistry::new(),
            classifier: Classifier::new(inspector),
            dispatcher: Dispatcher::new(actions, launcher),
        }
    }

    /// Classifies one raw event and runs whatever actions the resulting
    /// transition calls for. Returns the transition.
    pub fn handle(&mut self, event: &RawEvent) -> Transition {
        let transition = self.classifier.classify(
            &mut self.registry,
            self.dispatcher.last_foreground(),
            event,
        );
        self.dispatcher.dispatch(&transition);
        transition
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            last_foreground: self.dispatcher.last_foreground().map(str::to_string),
            tracked_windows: self.registry.window_count(),
            processes: self.registry.processes(),
            pending_deferred: self.dispatcher.pending_deferred(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::FakeInspector;
    use crate::config::ActionSet;
    use crate::dispatcher::tests::{action, table, RecordingLauncher};
    use crate::event::{RawEventKind, WindowHandle};

    const GAME_WINDOW: WindowHandle = WindowHandle(0xA0);
    const GAME_POPUP: WindowHandle = WindowHandle(0xA1);
    const OTHER_WINDOW: WindowHandle = WindowHandle(0xB0);
    const HELPER_WINDOW: WindowHandle = WindowHandle(0xC0);

    fn created(w: WindowHandle, pid: u32) -> RawEvent {
        RawEvent::window(RawEventKind::ObjectCreated, w, Some(pid))
    }

    fn focused(w: WindowHandle, pid: u32) -> RawEvent {
        RawEvent::window(RawEventKind::ForegroundChanged, w, Some(pid))
    }

    fn destroyed(w: WindowHandle) -> RawEvent {
        RawEvent::window(RawEventKind::ObjectDestroyed, w, None)
    }

    fn session() -> (Session, RecordingLauncher) {
        let inspector = FakeInspector::with(&[
            (100, r"C:\Games\Game.exe"),
            (200, r"C:\Apps\Other.exe"),
            (300, r"C:\Windows\System32\rundll32.exe"),
        ]);
        let actions = table(vec![
            (
                "game.exe",
                ActionSet {
                    start: vec![action("start-helper", "--pid %pid%", false)],
                    finish: vec![
                        action("stop-helper", "%pid%", false),
                        action("resume-scripts", "", true),
                    ],
                },
            ),
            (
                "rundll32.exe",
                ActionSet {
                    start: vec![action("never", "", false)],
                    finish: vec![action("never", "", true)],
                },
            ),
        ]);
        let launcher = RecordingLauncher::default();
        let session = Session::new(actions, Box::new(inspector), Box::new(launcher.clone()));
        (session, launcher)
    }

    #[test]
    fn create_starts_process_and_runs_start_action() {
        let (mut s, l) = session();
        let t = s.handle(&created(GAME_WINDOW, 100));
        assert_eq!(
            t,
            Transition::ProcessStarted {
                pid: 100,
                exe: "game.exe".into(),
            }
        );
        let launches = l.launches.lock().unwrap();
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].command, "start-helper");
        assert_eq!(launches[0].args, vec!["--pid", "100"]);
    }

    #[test]
    fn repeated_foreground_is_forwarded_once() {
        let (mut s, _l) = session();
        s.handle(&created(GAME_WINDOW, 100));

        let t = s.handle(&focused(GAME_WINDOW, 100));
        assert_eq!(
            t,
            Transition::ForegroundChanged {
                exe: "game.exe".into(),
                pid: 100,
            }
        );
        assert_eq!(s.snapshot().last_foreground.as_deref(), Some("game.exe"));

        assert_eq!(s.handle(&focused(GAME_WINDOW, 100)), Transition::Ignored);
    }

    #[test]
    fn background_action_runs_when_focus_moves_and_again_when_it_returns() {
        let (mut s, l) = session();
        s.handle(&created(GAME_WINDOW, 100));
        s.handle(&focused(GAME_WINDOW, 100));
        l.clear();

        let t = s.handle(&focused(OTHER_WINDOW, 200));
        assert_eq!(
            t,
            Transition::ForegroundChanged {
                exe: "other.exe".into(),
                pid: 200,
            }
        );
        assert_eq!(l.commands(), vec!["resume-scripts"]);
        assert_eq!(s.snapshot().pending_deferred, 0);

        // Back to the game: its action is queued again, to run on the next switch.
        l.clear();
        s.handle(&focused(GAME_WINDOW, 100));
        assert!(l.commands().is_empty());
        assert_eq!(s.snapshot().pending_deferred, 1);

        s.handle(&focused(OTHER_WINDOW, 200));
        assert_eq!(l.commands(), vec!["resume-scripts"]);
    }

    #[test]
    fn destroying_only_window_runs_every_finish_action() {
        let (mut s, l) = session();
        s.handle(&created(GAME_WINDOW, 100));
        l.clear();

        let t = s.handle(&destroyed(GAME_WINDOW));
        assert_eq!(
            t,
            Transition::ProcessFinished {
                pid: 100,
                exe: "game.exe".into(),
            }
        );
        assert_eq!(l.commands(), vec!["stop-helper", "resume-scripts"]);
        assert_eq!(l.launches.lock().unwrap()[0].args, vec!["100"]);
        assert_eq!(s.snapshot().tracked_windows, 0);
    }

    #[test]
    fn unresolvable_process_is_ignored_without_launching() {
        let (mut s, l) = session();
        assert_eq!(s.handle(&created(GAME_WINDOW, 4040)), Transition::Ignored);
        assert_eq!(s.snapshot().tracked_windows, 0);
        assert!(l.commands().is_empty());
    }

    #[test]
    fn rundll32_never_produces_transitions() {
        let (mut s, l) = session();
        for ev in [
            created(HELPER_WINDOW, 300),
            focused(HELPER_WINDOW, 300),
            destroyed(HELPER_WINDOW),
        ] {
            assert_eq!(s.handle(&ev), Transition::Ignored);
        }
        assert!(l.commands().is_empty());
    }

    #[test]
    fn process_with_two_windows_finishes_once() {
        let (mut s, l) = session();
        s.handle(&created(GAME_WINDOW, 100));
        s.handle(&focused(GAME_POPUP, 100));
        l.clear();

        assert_eq!(s.handle(&destroyed(GAME_POPUP)), Transition::Ignored);
        assert!(l.commands().is_empty());

        assert_eq!(
            s.handle(&destroyed(GAME_WINDOW)),
            Transition::ProcessFinished {
                pid: 100,
                exe: "game.exe".into(),
            }
        );
        assert_eq!(s.handle(&destroyed(GAME_WINDOW)), Transition::Ignored);
        assert_eq!(l.commands(), vec!["stop-helper", "resume-scripts"]);
    }

    #[test]
    fn snapshot_reports_tracked_state() {
        let (mut s, _l) = session();
        s.handle(&created(GAME_WINDOW, 100));
        s.handle(&focused(GAME_POPUP, 100));
        s.handle(&created(OTHER_WINDOW, 200));

        let snap = s.snapshot();
        assert_eq!(snap.tracked_windows, 3);
        assert_eq!(snap.processes.len(), 2);
        assert_eq!(snap.processes[0].pid, 100);
        assert_eq!(snap.processes[0].windows, 2);
        assert_eq!(snap.last_foreground.as_deref(), Some("game.exe"));
        assert_eq!(snap.pending_deferred, 1);
    }

    #[test]
    fn sessions_are_independent() {
        let (mut a, la) = session();
        let (mut b, lb) = session();
        a.handle(&created(GAME_WINDOW, 100));
        assert_eq!(a.snapshot().tracked_windows, 1);
        assert_eq!(b.snapshot().tracked_windows, 0);
        assert!(lb.commands().is_empty());
        assert_eq!(
            b.handle(&created(GAME_WINDOW, 100)),
            Transition::ProcessStarted {
                pid: 100,
                exe: "game.exe".into(),
            }
        );
        assert_eq!(la.commands().len(), 1);
    }
}
