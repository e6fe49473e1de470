/// Opaque OS window handle. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// The three WinEvent categories the listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    ObjectCreated,
    ObjectDestroyed,
    ForegroundChanged,
}

/// `idObject` value identifying the window itself.
pub const OBJID_WINDOW: i32 = 0;
/// `idChild` value identifying the object itself rather than a child element.
pub const CHILDID_SELF: i32 = 0;

/// One notification from the OS event source, already decoded into plain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub window: WindowHandle,
    pub kind: RawEventKind,
    pub object_id: i32,
    pub child_id: i32,
    /// Owning process id as reported by the OS at notification time, if any.
    /// Destroyed windows usually no longer report an owner.
    pub owner_pid: Option<u32>,
}

impl RawEvent {
    /// A window-level event (`OBJID_WINDOW`, `CHILDID_SELF`).
    #[cfg(test)]
    pub fn window(kind: RawEventKind, window: WindowHandle, owner_pid: Option<u32>) -> Self {
        Self {
            window,
            kind,
            object_id: OBJID_WINDOW,
            child_id: CHILDID_SELF,
            owner_pid,
        }
    }

    /// True when the event concerns the window object itself.
    pub fn targets_window(&self) -> bool {
        is_window_object(self.object_id, self.child_id)
    }
}

/// True for the `idObject`/`idChild` pair that names a whole window rather
/// than a caret, cursor, menu or child element inside it.
pub fn is_window_object(object_id: i32, child_id: i32) -> bool {
    object_id == OBJID_WINDOW && child_id == CHILDID_SELF
}

/// Semantic process lifecycle transition produced for each raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A new interesting process created its first tracked window.
    ProcessStarted { pid: u32, exe: String },
    /// The last tracked window of a process was destroyed.
    ProcessFinished { pid: u32, exe: String },
    /// A tracked executable different from the previous one gained focus.
    ForegroundChanged { exe: String, pid: u32 },
    Ignored,
}
