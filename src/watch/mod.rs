//! Development watcher.
//!
//! Implements the "watcher-first" pattern: the filesystem subscription is
//! opened before the initial build, so edits made while it runs are
//! buffered instead of lost.
//!
//! ```text
//! notify → Debouncer (coalesce + stabilize) → router::classify → router::execute
//!                                                  (one tokio task per event)
//! ```

mod debouncer;
pub mod router;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::builder::{Builder, TaskOptions};
use crate::core::BuildContext;
use crate::logger::status_error;
use crate::{debug, log};
use debouncer::Debouncer;

/// A settled filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(p) | Self::Modified(p) | Self::Removed(p) => p,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Removed(_) => "removed",
        }
    }
}

/// Live subscription to the source and public roots.
pub struct FsWatcher {
    /// Must stay alive for events to flow
    _watcher: RecommendedWatcher,
    rx: mpsc::UnboundedReceiver<notify::Event>,
}

impl FsWatcher {
    /// Start watching every existing root immediately. Events buffer in the
    /// channel until [`watch_loop`] drains them.
    pub fn new(roots: &[&Path]) -> notify::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    // Receiver gone means the session is over
                    let _ = tx.send(event);
                }
                Err(e) => log!("watch"; "notify error: {}", e),
            }
        })?;

        for root in roots {
            if root.is_dir() {
                watcher.watch(root, RecursiveMode::Recursive)?;
            } else {
                debug!("watch"; "skipping missing root {}", root.display());
            }
        }

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }
}

/// The `watch` task: subscribe, build once, then hand events to a
/// background loop that lives until shutdown.
pub async fn run(ctx: Arc<BuildContext>, _options: TaskOptions) -> Result<()> {
    let watcher = FsWatcher::new(&[ctx.paths.src.as_path(), ctx.paths.public.as_path()])
        .context("failed to start file watcher")?;

    tokio::fs::create_dir_all(&ctx.paths.dist)
        .await
        .with_context(|| format!("failed to create {}", ctx.paths.dist.display()))?;

    // A broken initial build is reported, not fatal: the next save retries
    if let Err(e) = Builder::new(Arc::clone(&ctx)).run_stages().await {
        status_error("initial build failed", &format!("{e:#}"));
    }

    log!(
        "watch";
        "watching {} and {}",
        ctx.paths.display(&ctx.paths.src),
        ctx.paths.display(&ctx.paths.public)
    );
    tokio::spawn(watch_loop(ctx, watcher));
    Ok(())
}

/// Drain, debounce and dispatch events until shutdown.
pub async fn watch_loop(ctx: Arc<BuildContext>, mut watcher: FsWatcher) {
    let mut debouncer = Debouncer::new();

    loop {
        tokio::select! {
            biased;
            _ = ctx.shutdown.wait() => break,
            Some(event) = watcher.rx.recv() => debouncer.add_event(&event),
            _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                for event in debouncer.take_ready() {
                    tokio::spawn(router::handle(Arc::clone(&ctx), event));
                }
            }
        }
    }

    debug!("watch"; "watcher stopped");
}
