//! Template include tracking for incremental rebuilds.
//!
//! The graph is plain data; the build context owns one instance behind a
//! `parking_lot::RwLock`, so concurrent watcher handlers never interleave
//! partial updates. No lock is held across an await point.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

type PathSet = FxHashSet<PathBuf>;
type PathSetMap = FxHashMap<PathBuf, PathSet>;

/// Bidirectional dependency graph: dependent template ↔ included partial.
///
/// # Invariants
/// - Forward and reverse mappings are always consistent
/// - Reverse sets are never empty (emptied sets are pruned)
/// - Self-references are excluded
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward: dependent → partials it includes
    forward: PathSetMap,
    /// Reverse: partial → dependents including it
    reverse: PathSetMap,
}

impl DependencyGraph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent`'s output embeds `partial`. Idempotent.
    pub fn add_dependency(&mut self, dependent: &Path, partial: &Path) {
        if dependent == partial {
            return;
        }
        self.forward
            .entry(dependent.to_path_buf())
            .or_default()
            .insert(partial.to_path_buf());
        self.reverse
            .entry(partial.to_path_buf())
            .or_default()
            .insert(dependent.to_path_buf());
    }

    /// Every file transitively depending on `partial`, breadth-first.
    ///
    /// Each dependent appears once. The seed is excluded unless a cycle
    /// leads back to it.
    pub fn affected_dependents(&self, partial: &Path) -> Vec<PathBuf> {
        let mut visited: FxHashSet<&Path> = FxHashSet::default();
        let mut queue: VecDeque<&Path> = VecDeque::from([partial]);
        let mut affected = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(dependents) = self.reverse.get(current) else {
                continue;
            };
            for dependent in dependents {
                if visited.insert(dependent.as_path()) {
                    affected.push(dependent.clone());
                    queue.push_back(dependent.as_path());
                }
            }
        }

        affected
    }

    /// Remove `path` both as a dependent and as a dependency of others.
    ///
    /// Called before recompiling a template and when a file is deleted.
    pub fn clear_dependencies(&mut self, path: &Path) {
        // As a dependent: drop forward edges, prune emptied reverse sets
        if let Some(partials) = self.forward.remove(path) {
            for partial in partials {
                if let Some(dependents) = self.reverse.get_mut(&partial) {
                    dependents.remove(path);
                    if dependents.is_empty() {
                        self.reverse.remove(&partial);
                    }
                }
            }
        }

        // As a dependency: drop it from every dependent that lists it
        if let Some(dependents) = self.reverse.remove(path) {
            for dependent in dependents {
                if let Some(partials) = self.forward.get_mut(&dependent) {
                    partials.remove(path);
                    if partials.is_empty() {
                        self.forward.remove(&dependent);
                    }
                }
            }
        }
    }

    /// Partials `dependent` includes directly.
    pub fn dependencies_of(&self, dependent: &Path) -> Vec<PathBuf> {
        self.forward
            .get(dependent)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// Number of files that are included by something.
    #[inline]
    pub fn reverse_count(&self) -> usize {
        self.reverse.len()
    }
}
