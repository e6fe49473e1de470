/// Single-slot queue of finish actions waiting for the current foreground app
/// to lose focus. Writes replace the whole queue; reads drain all of it.
use crate::config::Action;

/// Actions captured for one executable. They run with the pid of whichever
/// process takes the foreground next.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredBatch {
    pub exe: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Default)]
pub struct DeferredQueue {
    pending: Option<DeferredBatch>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any queued batch. An empty action list clears the queue.
    pub fn replace(&mut self, exe: &str, actions: Vec<Action>) {
        self.pending = if actions.is_empty() {
            None
        } else {
            Some(DeferredBatch {
                exe: exe.to_string(),
                actions,
            })
        };
    }

    /// Removes and returns the queued batch, leaving the queue empty.
    pub fn drain(&mut self) -> Option<DeferredBatch> {
        self.pending.take()
    }

    pub fn len(&self) -> usize {
        self.pending.as_ref().map_or(0, |b| b.actions.len())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> Action {
        Action {
            name: name.to_string(),
            args: String::new(),
            hide_window: false,
            on_foreground: false,
            on_background: true,
        }
    }

    #[test]
    fn new_queue_is_empty() {
        let mut q = DeferredQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(q.drain().is_none());
    }

    #[test]
    fn drain_returns_batch_and_clears() {
        let mut q = DeferredQueue::new();
        q.replace("game.exe", vec![action("a"), action("b")]);
        assert_eq!(q.len(), 2);

        let batch = q.drain().unwrap();
        assert_eq!(batch.exe, "game.exe");
        assert_eq!(batch.actions.len(), 2);
        assert!(q.is_empty());
        assert!(q.drain().is_none());
    }

    #[test]
    fn replace_discards_previous_batch() {
        let mut q = DeferredQueue::new();
        q.replace("game.exe", vec![action("a")]);
        q.replace("other.exe", vec![action("b"), action("c")]);

        let batch = q.drain().unwrap();
        assert_eq!(batch.exe, "other.exe");
        assert_eq!(batch.actions, vec![action("b"), action("c")]);
    }

    #[test]
    fn replace_with_nothing_clears() {
        let mut q = DeferredQueue::new();
        q.replace("game.exe", vec![action("a")]);
        q.replace("other.exe", Vec::new());
        assert!(q.is_empty());
    }
}
