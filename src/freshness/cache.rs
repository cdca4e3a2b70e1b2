//! Per-session change cache: content fingerprints and compiled templates.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use super::{ContentHash, hash_file};
use crate::transform::template::CompiledTemplate;

/// Answers "did this file change since it was last built?" and keeps
/// compiled templates around between rebuilds.
///
/// # Invariants
/// - A path without a fingerprint counts as changed.
/// - Every check stores the fresh fingerprint, whatever the outcome.
/// - A check that reports a change also evicts the compiled template, so
///   a stale compilation never outlives an edit.
/// - Invalidating a template drops both its compiled entry and its
///   fingerprint, so the next check reports it as changed.
#[derive(Debug)]
pub struct ChangeCache {
    hashes: DashMap<PathBuf, ContentHash>,
    templates: DashMap<PathBuf, Arc<CompiledTemplate>>,
    /// Compiled templates are only kept when set (development sessions).
    cache_templates: bool,
}

impl ChangeCache {
    pub fn new(cache_templates: bool) -> Self {
        Self {
            hashes: DashMap::new(),
            templates: DashMap::new(),
            cache_templates,
        }
    }

    #[inline]
    pub fn caches_templates(&self) -> bool {
        self.cache_templates
    }

    /// Hash `path` and compare against the stored fingerprint.
    ///
    /// An unreadable file (vanished mid-check) reports `true` so the caller
    /// retries naturally instead of aborting a batch.
    pub fn has_changed(&self, path: &Path) -> bool {
        self.record(path, hash_file(path).ok())
    }

    /// Concurrently check `paths`, returning the changed ones in input order.
    pub async fn filter_changed(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut set = JoinSet::new();
        for (index, path) in paths.into_iter().enumerate() {
            set.spawn_blocking(move || {
                let hash = hash_file(&path).ok();
                (index, path, hash)
            });
        }

        let mut changed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, path, hash)) => {
                    if self.record(&path, hash) {
                        changed.push((index, path));
                    }
                }
                Err(e) => crate::debug!("cache"; "hash task failed: {}", e),
            }
        }

        changed.sort_unstable_by_key(|(index, _)| *index);
        changed.into_iter().map(|(_, path)| path).collect()
    }

    /// Store the new fingerprint and report whether it differs.
    fn record(&self, path: &Path, hash: Option<ContentHash>) -> bool {
        match hash {
            Some(hash) => {
                let previous = self.hashes.insert(path.to_path_buf(), hash);
                let changed = previous != Some(hash);
                if changed {
                    crate::debug!("cache"; "{} {}", hash, path.display());
                    self.templates.remove(path);
                }
                changed
            }
            None => {
                self.hashes.remove(path);
                self.templates.remove(path);
                true
            }
        }
    }

    pub fn get_template(&self, path: &Path) -> Option<Arc<CompiledTemplate>> {
        if !self.cache_templates {
            return None;
        }
        self.templates.get(path).map(|entry| Arc::clone(entry.value()))
    }

    pub fn set_template(&self, path: &Path, template: Arc<CompiledTemplate>) {
        if self.cache_templates {
            self.templates.insert(path.to_path_buf(), template);
        }
    }

    /// Forget both the compiled template and the fingerprint of `path`.
    pub fn invalidate_template(&self, path: &Path) {
        self.templates.remove(path);
        self.hashes.remove(path);
    }

    pub fn clear(&self) {
        self.hashes.clear();
        self.templates.clear();
    }

    pub fn fingerprint_count(&self) -> usize {
        self.hashes.len()
    }
}
