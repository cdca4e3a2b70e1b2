//! Fan-out of live events to event-stream subscribers.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::LiveEvent;

/// Handle to the set of connected browsers.
///
/// Cloning shares the same subscriber list. Each subscriber owns a
/// [`Receiver`]; a subscriber that went away is pruned on the next
/// [`notify`](Self::notify).
#[derive(Debug, Clone, Default)]
pub struct LiveChannel {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    subscribers: Mutex<Vec<Sender<LiveEvent>>>,
    closed: AtomicBool,
}

impl LiveChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// After [`close`](Self::close) the returned receiver is already
    /// disconnected.
    pub fn subscribe(&self) -> Receiver<LiveEvent> {
        let (tx, rx) = channel::unbounded();
        if !self.inner.closed.load(Ordering::SeqCst) {
            self.inner.subscribers.lock().push(tx);
        }
        rx
    }

    /// Deliver `event` to every live subscriber. Returns how many got it.
    pub fn notify(&self, event: LiveEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|tx| tx.send(event).is_ok());
        crate::debug!("reload"; "{} -> {} client(s)", event.name(), subscribers.len());
        subscribers.len()
    }

    pub fn client_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Disconnect every subscriber and refuse new ones.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.subscribers.lock().clear();
    }
}
