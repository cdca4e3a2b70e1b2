//! Event → action routing.
//!
//! [`classify`] is a pure decision over the event, its category and the
//! dependency graph; [`execute`] performs it. Within one event the order
//! is fixed: invalidate, then rebuild or delete, then (after a short
//! flush delay) notify the browser.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::WatchEvent;
use crate::builder::{BuildError, TaskKind, TaskOptions};
use crate::core::{
    BuildContext, SourceKind, artifact_path, has_source_map, is_icon_source, is_partial, source_map_path,
    sprite_path,
};
use crate::reload::LiveEvent;
use crate::utils::fs::{remove_if_exists, walk_files};
use crate::{debug, log};

/// Delay between a finished write and the browser notification.
pub const NOTIFY_DELAY: Duration = Duration::from_millis(100);

/// What to do about one filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ignore,
    /// Run `task`, scoped to `files` when given.
    Rebuild {
        task: TaskKind,
        files: Option<Vec<PathBuf>>,
        /// Templates whose cached compile and fingerprint are dropped first.
        invalidate: Vec<PathBuf>,
        notify: Option<LiveEvent>,
    },
    /// Forget `source` and delete its artifact (and source map, if any).
    Remove {
        source: PathBuf,
        artifact: Option<PathBuf>,
        /// Drop the source's dependency edges and cached compile.
        clear_deps: bool,
        notify: Option<LiveEvent>,
    },
}

impl Action {
    fn rebuild(task: TaskKind, files: Option<Vec<PathBuf>>, notify: LiveEvent) -> Self {
        Self::Rebuild {
            task,
            files,
            invalidate: Vec::new(),
            notify: Some(notify),
        }
    }

    fn remove(source: &Path, artifact: Option<PathBuf>, notify: LiveEvent) -> Self {
        Self::Remove {
            source: source.to_path_buf(),
            artifact,
            clear_deps: false,
            notify: Some(notify),
        }
    }
}

/// Decide what `event` requires.
pub fn classify(event: &WatchEvent, ctx: &BuildContext) -> Action {
    let path = event.path();
    let paths = &ctx.paths;
    let removed = matches!(event, WatchEvent::Removed(_));

    if is_icon_source(path, paths) && has_extension(path, "svg") {
        return classify_icon(path, removed, ctx);
    }

    let Some(kind) = SourceKind::classify(path, paths) else {
        return Action::Ignore;
    };
    let partial = kind != SourceKind::Static && is_partial(path, paths);
    let artifact = || artifact_path(kind, path, paths, ctx.config.build.image_optimization);

    match (kind, removed) {
        (SourceKind::Template, false) => {
            let mut files = vec![path.to_path_buf()];
            files.extend(ctx.graph.read().affected_dependents(path));
            Action::Rebuild {
                task: TaskKind::Template,
                files: Some(files.clone()),
                invalidate: files,
                notify: Some(LiveEvent::Reload),
            }
        }
        (SourceKind::Template, true) => Action::Remove {
            source: path.to_path_buf(),
            artifact: if partial { None } else { artifact() },
            clear_deps: true,
            notify: (!partial).then_some(LiveEvent::Reload),
        },

        (SourceKind::Style, false) => Action::rebuild(TaskKind::Style, None, LiveEvent::CssUpdate),
        (SourceKind::Script, false) => Action::rebuild(TaskKind::Script, None, LiveEvent::Reload),
        (SourceKind::Static, false) => Action::rebuild(TaskKind::Copy, None, LiveEvent::Reload),
        (SourceKind::Vector, false) if !partial => {
            Action::rebuild(TaskKind::Vector, Some(vec![path.to_path_buf()]), LiveEvent::Reload)
        }
        (SourceKind::Raster, false) if !partial => {
            Action::rebuild(TaskKind::Image, Some(vec![path.to_path_buf()]), LiveEvent::Reload)
        }

        // Partials own no artifact
        (_, true) if partial => Action::Ignore,
        (SourceKind::Style, true) => Action::remove(path, artifact(), LiveEvent::CssUpdate),
        (_, true) => Action::remove(path, artifact(), LiveEvent::Reload),

        _ => Action::Ignore,
    }
}

/// Icon edits rebuild their sprite; removing the last icon deletes it.
fn classify_icon(path: &Path, removed: bool, ctx: &BuildContext) -> Action {
    let Some(dir) = path.parent() else {
        return Action::Ignore;
    };
    let remaining = walk_files(dir, false)
        .iter()
        .any(|f| f != path && has_extension(f, "svg"));

    if removed && !remaining {
        return Action::remove(path, sprite_path(dir, &ctx.paths), LiveEvent::Reload);
    }
    Action::rebuild(TaskKind::Sprite, Some(vec![path.to_path_buf()]), LiveEvent::Reload)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Carry out `action`.
pub async fn execute(ctx: &Arc<BuildContext>, action: Action) -> Result<()> {
    match action {
        Action::Ignore => Ok(()),

        Action::Rebuild {
            task: kind,
            files,
            invalidate,
            notify,
        } => {
            for path in &invalidate {
                ctx.cache.invalidate_template(path);
            }

            let task = ctx
                .tasks
                .get(kind)
                .cloned()
                .ok_or_else(|| BuildError::TaskNotFound(kind.name().to_string()))?;
            let options = TaskOptions { files };
            task.run(Arc::clone(ctx), options)
                .await
                .with_context(|| format!("{kind} task failed"))?;

            send(ctx, notify).await;
            Ok(())
        }

        Action::Remove {
            source,
            artifact,
            clear_deps,
            notify,
        } => {
            if clear_deps {
                ctx.graph.write().clear_dependencies(&source);
                ctx.cache.invalidate_template(&source);
            }
            if let Some(artifact) = artifact {
                if remove_if_exists(&artifact).await? {
                    debug!("watch"; "deleted {}", ctx.paths.display(&artifact));
                }
                let compiled = SourceKind::classify(&source, &ctx.paths).is_some_and(has_source_map);
                if compiled {
                    remove_if_exists(&source_map_path(&artifact)).await?;
                }
            }

            send(ctx, notify).await;
            Ok(())
        }
    }
}

async fn send(ctx: &BuildContext, notify: Option<LiveEvent>) {
    if let Some(event) = notify {
        tokio::time::sleep(NOTIFY_DELAY).await;
        ctx.live.notify(event);
    }
}

/// Classify and execute one event, reporting the outcome.
///
/// Failures are logged; they never escape into the watch loop.
pub async fn handle(ctx: Arc<BuildContext>, event: WatchEvent) {
    let action = classify(&event, &ctx);
    let label = ctx.paths.display(event.path()).to_string();

    if action == Action::Ignore {
        debug!("watch"; "ignored {} {}", event.label(), label);
        return;
    }
    log!("watch"; "{} {}", event.label(), label);

    match execute(&ctx, action).await {
        Ok(()) => crate::logger::status_success(&format!("{} {}", event.label(), label)),
        Err(e) => crate::logger::status_error(&format!("failed to process {label}"), &format!("{e:#}")),
    }
}
