//! Filesystem helpers shared by tasks: discovery, writing, idempotent deletes.

use anyhow::{Context, Result};
use jwalk::WalkDir;
use std::io;
use std::path::{Path, PathBuf};

/// Directories never descended into during discovery.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Every file under `root`, sorted. Missing roots yield nothing.
///
/// `include_hidden` controls dotfiles and dot-directories; dependency and
/// version-control directories are always skipped.
pub fn walk_files(root: &Path, include_hidden: bool) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .skip_hidden(!include_hidden)
        .process_read_dir(|_, _, _, children| {
            children.retain(|entry| {
                entry.as_ref().map_or(true, |e| {
                    let name = e.file_name().to_str().unwrap_or_default();
                    !(e.file_type().is_dir() && IGNORED_DIRS.contains(&name))
                })
            });
        })
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

/// Write `contents` to `path`, creating parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Copy `from` to `to`, creating parent directories as needed.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::copy(from, to)
        .await
        .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Delete a file or directory. Already-missing targets are not an error.
///
/// Returns whether something was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool> {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Remove `dir` recursively and recreate it empty.
pub async fn reset_dir(dir: &Path) -> Result<()> {
    remove_if_exists(dir).await?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))
}
