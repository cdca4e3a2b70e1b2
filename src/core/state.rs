//! Session shutdown signalling.
//!
//! A [`Shutdown`] is owned by the build context and observed by every
//! long-running part of a watch session: the filesystem watcher loop, the
//! HTTP server and the event-stream clients. Ctrl+C triggers it once; a
//! second Ctrl+C exits the process immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Cloneable handle to a one-way "stop now" flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // Err means the sender is gone, which cannot outlive `self`
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Set once the first Ctrl+C has been handled.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide Ctrl+C handler for a watch session.
///
/// First press: graceful shutdown through `shutdown`.
/// Second press: exit immediately.
pub fn setup_shutdown_handler(shutdown: Shutdown) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        crate::log!("serve"; "shutting down...");
        shutdown.trigger();
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
