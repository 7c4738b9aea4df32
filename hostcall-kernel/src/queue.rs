//! Shared state between calling threads and the host thread.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::HostContext;

/// Closure queued for execution on the host thread.
pub type PendingAction = Box<dyn FnOnce(&mut HostContext<'_>) + Send>;

#[derive(Default)]
struct QueueState {
    actions: VecDeque<PendingAction>,
    closed: bool,
}

/// FIFO queue of pending actions with many producers and one consumer.
#[derive(Default)]
pub(crate) struct ActionQueue {
    state: Mutex<QueueState>,
}

impl ActionQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an action, handing it back when the queue is closed.
    pub(crate) fn push(&self, action: PendingAction) -> Result<(), PendingAction> {
        let mut state = self.lock();
        if state.closed {
            return Err(action);
        }
        state.actions.push_back(action);
        Ok(())
    }

    /// Takes every action queued so far, leaving the queue empty.
    pub(crate) fn drain(&self) -> VecDeque<PendingAction> {
        mem::take(&mut self.lock().actions)
    }

    /// Reopens the queue for a new host loop.
    pub(crate) fn open(&self) {
        self.lock().closed = false;
    }

    /// Rejects further pushes and returns whatever was still queued.
    pub(crate) fn close(&self) -> VecDeque<PendingAction> {
        let mut state = self.lock();
        state.closed = true;
        mem::take(&mut state.actions)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().actions.len()
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Single-value mailbox holding the most recent unreported fire-and-forget
/// failure.
///
/// Last write wins: a new failure replaces an unread one, and nothing is
/// queued behind it.
#[derive(Debug, Default)]
pub(crate) struct ErrorSlot {
    message: Mutex<Option<String>>,
}

impl ErrorSlot {
    /// Stores `message`, returning the message it replaced.
    pub(crate) fn replace(&self, message: String) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(message)
    }

    /// Reads and clears the slot.
    pub(crate) fn take(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns a copy of the parked message without clearing it.
    pub(crate) fn peek(&self) -> Option<String> {
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn slot_is_last_write_wins() {
        let slot = ErrorSlot::default();
        assert_eq!(slot.replace("first".into()), None);
        assert_eq!(slot.replace("second".into()), Some("first".into()));
        assert_eq!(slot.peek().as_deref(), Some("second"));
        assert_eq!(slot.take().as_deref(), Some("second"));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn closed_queue_hands_actions_back() {
        let queue = ActionQueue::default();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        assert!(queue
            .push(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .is_ok());

        let leftover = queue.close();
        assert_eq!(leftover.len(), 1);
        assert!(queue.is_closed());
        assert!(queue.push(Box::new(|_| {})).is_err());

        queue.open();
        assert!(queue.push(Box::new(|_| {})).is_ok());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain().len(), 1);
        assert_eq!(queue.len(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
