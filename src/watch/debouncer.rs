use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use rustc_hash::FxHashMap;

use super::WatchEvent;
use crate::utils::path::normalize_path;

/// How long a file's size and mtime must hold still before it is reported.
pub(super) const STABLE_MS: u64 = 100;

/// Directories whose contents never produce events.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Size and mtime snapshot used for the stabilization check.
type Stamp = Option<(u64, SystemTime)>;

#[derive(Debug, Clone, Copy)]
pub(super) struct Pending {
    pub(super) kind: ChangeKind,
    stamp: Stamp,
    since: Instant,
}

/// Per-path coalescing plus a stabilization window.
///
/// No business logic: paths are only deduplicated and held until their
/// content stops changing.
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, Pending>,
    window: Duration,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self::with_window(Duration::from_millis(STABLE_MS))
    }

    pub(super) fn with_window(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            window,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (file came and went)
    /// - otherwise: first kind wins, window restarts
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Metadata-only changes (atime, chmod) are noise
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);

        for path in &event.paths {
            // Renames report both names; the vanished one is a removal
            let kind = if kind == ChangeKind::Modified && !path.exists() {
                ChangeKind::Removed
            } else {
                kind
            };
            self.add(path, kind);
        }
    }

    pub(super) fn add(&mut self, path: &Path, kind: ChangeKind) {
        if is_ignored(path) {
            return;
        }
        let path = normalize_path(path);

        let kind = match self.changes.get(&path).map(|p| p.kind) {
            None => kind,
            Some(ChangeKind::Removed) if kind != ChangeKind::Removed => kind,
            Some(ChangeKind::Modified) if kind == ChangeKind::Removed => ChangeKind::Removed,
            Some(ChangeKind::Created) if kind == ChangeKind::Removed => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
                return;
            }
            Some(existing) => existing,
        };

        let stamp = stamp(&path);
        self.changes.insert(
            path,
            Pending {
                kind,
                stamp,
                since: Instant::now(),
            },
        );
    }

    /// Events whose file held still for a whole window, sorted by path.
    ///
    /// Files still changing get their window restarted.
    pub(super) fn take_ready(&mut self) -> Vec<WatchEvent> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.changes.retain(|path, pending| {
            if now.duration_since(pending.since) < self.window {
                return true;
            }
            if pending.kind == ChangeKind::Removed {
                ready.push(WatchEvent::Removed(path.clone()));
                return false;
            }

            let current = stamp(path);
            if current != pending.stamp {
                pending.stamp = current;
                pending.since = now;
                return true;
            }

            match (pending.kind, current) {
                // Vanished before settling
                (ChangeKind::Created, None) => {}
                (_, None) => ready.push(WatchEvent::Removed(path.clone())),
                (ChangeKind::Created, Some(_)) => ready.push(WatchEvent::Added(path.clone())),
                _ => ready.push(WatchEvent::Modified(path.clone())),
            }
            false
        });

        ready.sort_by(|a, b| a.path().cmp(b.path()));
        ready
    }

    /// Time until the oldest pending path may be ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let now = Instant::now();
        self.changes
            .values()
            .map(|p| self.window.saturating_sub(now.duration_since(p.since)))
            .min()
            .unwrap_or(Duration::from_secs(86400))
            .max(Duration::from_millis(1))
    }
}

fn stamp(path: &Path) -> Stamp {
    let meta = fs::metadata(path).ok()?;
    Some((meta.len(), meta.modified().ok()?))
}

/// Editor temp/backup files, dotfiles, and anything inside ignored dirs.
pub(super) fn is_ignored(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let temp = matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.');

    temp || path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|s| IGNORED_DIRS.contains(&s))
    })
}
