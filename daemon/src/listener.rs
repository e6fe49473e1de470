/// WinEvent listener for window creation, destruction and foreground changes.
///
/// The hooks are installed out-of-context on a dedicated OS thread that runs
/// its own Windows message pump. Windows delivers every callback on that
/// thread, and each one is classified and dispatched synchronously before the
/// pump continues. The thread exits when [`ListenerHandle::stop`] is called.
///
/// On non-Windows platforms [`start`] returns an error: without the hooks the
/// daemon has nothing to do.
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::session::Session;

/// A handle to the running listener thread.
pub struct ListenerHandle {
    #[cfg(windows)]
    thread: std::thread::JoinHandle<()>,
    /// Thread ID of the message-pump thread, used to post `WM_QUIT`.
    #[cfg(windows)]
    thread_id: u32,
}

impl ListenerHandle {
    /// Signals the listener thread to unhook and blocks until it exits.
    pub fn stop(self) {
        #[cfg(windows)]
        {
            imp::post_quit(self.thread_id);
            let _ = self.thread.join();
        }
    }
}

/// Spawns the listener thread, installs the hooks on it and returns once they
/// are active. Hook installation failures are returned to the caller.
pub fn start(session: Arc<Mutex<Session>>) -> Result<ListenerHandle> {
    #[cfg(windows)]
    {
        use anyhow::{anyhow, Context};

        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32>>(1);
        let thread = std::thread::Builder::new()
            .name("winevent-pump".into())
            .spawn(move || imp::run_message_pump(session, ready_tx))
            .context("Failed to spawn listener thread")?;
        let thread_id = ready_rx
            .recv()
            .map_err(|_| anyhow!("listener thread exited before installing hooks"))??;
        Ok(ListenerHandle { thread, thread_id })
    }

    #[cfg(not(windows))]
    {
        drop(session);
        anyhow::bail!("window event hooks are only available on Windows")
    }
}

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(windows)]
mod imp {
    use std::cell::RefCell;
    use std::sync::mpsc as std_mpsc;
    use std::sync::{Arc, Mutex};

    use anyhow::{bail, Result};
    use tracing::{debug, info, warn};
    use windows::Win32::Foundation::{HMODULE, HWND, LPARAM, WPARAM};
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, GetMessageW, GetWindowThreadProcessId, PostThreadMessageW,
        TranslateMessage, EVENT_OBJECT_CREATE, EVENT_OBJECT_DESTROY, EVENT_SYSTEM_FOREGROUND,
        MSG, WINEVENT_OUTOFCONTEXT, WINEVENT_SKIPOWNPROCESS, WM_QUIT,
    };

    use crate::event::{is_window_object, RawEvent, RawEventKind, Transition, WindowHandle};
    use crate::session::Session;

    thread_local! {
        /// Session served by the hooks installed on this thread.
        static SESSION: RefCell<Option<Arc<Mutex<Session>>>> = const { RefCell::new(None) };
    }

    const SUBSCRIBED: [(u32, &str); 3] = [
        (EVENT_OBJECT_CREATE, "EVENT_OBJECT_CREATE"),
        (EVENT_SYSTEM_FOREGROUND, "EVENT_SYSTEM_FOREGROUND"),
        (EVENT_OBJECT_DESTROY, "EVENT_OBJECT_DESTROY"),
    ];

    fn event_kind(event: u32) -> Option<RawEventKind> {
        match event {
            EVENT_OBJECT_CREATE => Some(RawEventKind::ObjectCreated),
            EVENT_OBJECT_DESTROY => Some(RawEventKind::ObjectDestroyed),
            EVENT_SYSTEM_FOREGROUND => Some(RawEventKind::ForegroundChanged),
            _ => None,
        }
    }

    /// WinEvent callback. Decodes the notification and feeds it to the session.
    unsafe extern "system" fn win_event_proc(
        _hook: HWINEVENTHOOK,
        event: u32,
        hwnd: HWND,
        id_object: i32,
        id_child: i32,
        _event_thread: u32,
        _event_time: u32,
    ) {
        let Some(kind) = event_kind(event) else {
            return;
        };
        // Carets, cursors and child elements fire far more often than windows.
        if !is_window_object(id_object, id_child) {
            return;
        }

        let owner_pid = if hwnd.0 == 0 || kind == RawEventKind::ObjectDestroyed {
            None
        } else {
            let mut pid: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
            Some(pid).filter(|&p| p != 0)
        };

        let raw = RawEvent {
            window: WindowHandle(hwnd.0),
            kind,
            object_id: id_object,
            child_id: id_child,
            owner_pid,
        };

        SESSION.with(|cell| {
            let slot = cell.borrow();
            let Some(session) = slot.as_ref() else {
                return;
            };
            let Ok(mut session) = session.lock() else {
                warn!("Session lock poisoned; dropping event");
                return;
            };
            match session.handle(&raw) {
                Transition::Ignored => {}
                t => debug!(?t, "transition handled"),
            }
        });
    }

    fn unhook_all(hooks: &[HWINEVENTHOOK]) {
        for &hook in hooks {
            unsafe {
                let _ = UnhookWinEvent(hook);
            }
        }
    }

    fn install_hooks() -> Result<Vec<HWINEVENTHOOK>> {
        let mut hooks = Vec::with_capacity(SUBSCRIBED.len());
        for (event, name) in SUBSCRIBED {
            let hook = unsafe {
                SetWinEventHook(
                    event,
                    event,
                    HMODULE::default(),
                    Some(win_event_proc),
                    0,
                    0,
                    WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
                )
            };
            if hook.0 == 0 {
                unhook_all(&hooks);
                bail!("SetWinEventHook failed for {name}");
            }
            hooks.push(hook);
        }
        Ok(hooks)
    }

    /// Installs the hooks, reports the outcome on `ready_tx`, then runs a
    /// Windows message pump until `WM_QUIT` and uninstalls the hooks.
    pub fn run_message_pump(
        session: Arc<Mutex<Session>>,
        ready_tx: std_mpsc::SyncSender<Result<u32>>,
    ) {
        SESSION.with(|cell| *cell.borrow_mut() = Some(session));

        let hooks = match install_hooks() {
            Ok(hooks) => hooks,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let _ = ready_tx.send(Ok(unsafe { GetCurrentThreadId() }));
        drop(ready_tx);
        info!("Listening for window events");

        unsafe {
            let mut msg = MSG::default();
            // GetMessageW: >0 = message, 0 = WM_QUIT, <0 = error.
            while GetMessageW(&mut msg, None, 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        unhook_all(&hooks);
        SESSION.with(|cell| cell.borrow_mut().take());
        info!("Listener thread exited");
    }

    /// Posts `WM_QUIT` to `thread_id`, causing its `GetMessageW` loop to exit.
    pub fn post_quit(thread_id: u32) {
        unsafe {
            let _ = PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    }

}

// ── Tests ─────────────────────────────────────────────────────────────────────
