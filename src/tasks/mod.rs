//! Built-in task implementations.
//!
//! | Task       | Sources                      | Artifact                  |
//! |------------|------------------------------|---------------------------|
//! | `template` | `src/**/*.tpl`               | `dist/**/*.html`          |
//! | `style`    | `src/**/*.css`               | bundled `dist/**/*.css`   |
//! | `script`   | `src/**/*.{js,mjs,ts}`       | `dist/**/*.js`            |
//! | `sprite`   | `src/**/icons/*.svg`         | `dist/**/icons.svg`       |
//! | `image`    | `src/**/*.{jpg,png,gif}`     | per image strategy        |
//! | `vector`   | `src/**/*.svg`               | optimized `dist/**/*.svg` |
//! | `copy`     | `public/**`                  | mirrored into `dist/`     |
//!
//! Partials (see [`is_partial`]) are never discovered. Each task writes
//! only under its own artifact paths, so tasks in one stage never collide.
//! In development with `debug` on, `style` and `script` also write a
//! `<artifact>.map` source map and link it from the artifact.

pub mod copy;
pub mod image;
pub mod script;
pub mod sprite;
pub mod style;
pub mod template;
pub mod vector;

use anyhow::{Context, Result, anyhow};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::builder::{Task, TaskKind, TaskOptions, TaskSlots};
use crate::core::{BuildContext, SourceKind, is_partial, source_map_path};
use crate::utils::fs::{walk_files, write_file};

/// Slots with every built-in task registered.
pub fn default_slots() -> TaskSlots {
    TaskSlots::default()
        .with(TaskKind::Template, Task::new(template::run))
        .with(TaskKind::Style, Task::new(style::run))
        .with(TaskKind::Script, Task::new(script::run))
        .with(TaskKind::Sprite, Task::new(sprite::run))
        .with(TaskKind::Image, Task::new(image::run))
        .with(TaskKind::Vector, Task::new(vector::run))
        .with(TaskKind::Copy, Task::new(copy::run))
        .with(TaskKind::Watch, Task::new(crate::watch::run))
        .with(TaskKind::Server, Task::new(crate::reload::server::run))
}

/// Non-partial sources of `kind`: the scoped files when given, otherwise
/// everything under the source root.
pub(crate) fn sources(ctx: &BuildContext, kind: SourceKind, options: &TaskOptions) -> Vec<PathBuf> {
    let candidates = match &options.files {
        Some(files) => files.clone(),
        None => walk_files(&ctx.paths.src, false),
    };

    candidates
        .into_iter()
        .filter(|path| SourceKind::classify(path, &ctx.paths) == Some(kind))
        .filter(|path| !is_partial(path, &ctx.paths))
        .collect()
}

/// Run `job` for every file concurrently; the first failure wins.
///
/// Errors carry the failing file relative to the project root.
pub(crate) async fn for_each_file<F, Fut>(
    ctx: &Arc<BuildContext>,
    files: Vec<PathBuf>,
    job: F,
) -> Result<usize>
where
    F: Fn(Arc<BuildContext>, PathBuf) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for file in files {
        let label = ctx.paths.display(&file).to_string();
        let future = job(Arc::clone(ctx), file);
        set.spawn(async move { future.await.with_context(|| format!("failed to build {label}")) });
    }

    let mut count = 0;
    while let Some(joined) = set.join_next().await {
        joined.map_err(|e| anyhow!("worker panicked: {e}"))??;
        count += 1;
    }
    Ok(count)
}

/// Run CPU-bound work on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("worker panicked: {e}"))?
}

/// Compiled output plus its source map, when one was requested.
#[derive(Debug, Clone, Default)]
pub struct Emitted {
    pub code: String,
    pub map: Option<String>,
}

/// Comment syntax that links an artifact to its source map.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MapComment {
    Css,
    Js,
}

/// Write `emitted` to `output`, and its map next to it.
pub(crate) async fn write_emitted(output: &Path, emitted: Emitted, comment: MapComment) -> Result<()> {
    let Emitted { mut code, map } = emitted;
    let Some(map) = map else {
        return write_file(output, code).await;
    };

    let map_path = source_map_path(output);
    let name = map_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code.push_str(&match comment {
        MapComment::Css => format!("/*# sourceMappingURL={name} */\n"),
        MapComment::Js => format!("//# sourceMappingURL={name}\n"),
    });

    write_file(&map_path, map).await?;
    write_file(output, code).await
}
