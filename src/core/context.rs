//! Per-session build state.

use parking_lot::RwLock;

use super::{BuildMode, Paths, Shutdown};
use crate::builder::TaskSlots;
use crate::compiler::DependencyGraph;
use crate::config::SiteConfig;
use crate::freshness::ChangeCache;
use crate::reload::LiveChannel;

/// Everything one build or watch session shares across tasks.
///
/// Owned behind an `Arc` and handed to every task invocation, so several
/// sessions (e.g. in tests) never share caches.
#[derive(Debug)]
pub struct BuildContext {
    pub config: SiteConfig,
    pub paths: Paths,
    pub mode: BuildMode,
    pub cache: ChangeCache,
    pub graph: RwLock<DependencyGraph>,
    pub live: LiveChannel,
    pub tasks: TaskSlots,
    pub shutdown: Shutdown,
}

impl BuildContext {
    pub fn new(config: SiteConfig, mode: BuildMode, tasks: TaskSlots) -> Self {
        let paths = Paths::from_config(&config);
        Self {
            config,
            paths,
            mode,
            cache: ChangeCache::new(mode.is_dev()),
            graph: RwLock::new(DependencyGraph::new()),
            live: LiveChannel::new(),
            tasks,
            shutdown: Shutdown::new(),
        }
    }

    /// Readable output (expanded CSS, unminified JS) is kept only for
    /// development sessions with `debug` on.
    #[inline]
    pub fn minify(&self) -> bool {
        !(self.mode.is_dev() && self.config.debug)
    }

    /// Source maps accompany exactly the readable output.
    #[inline]
    pub fn source_maps(&self) -> bool {
        !self.minify()
    }

    /// Empty both the change cache and the dependency graph.
    pub fn reset_state(&self) {
        self.cache.clear();
        self.graph.write().clear();
    }
}
