//! Copy task: mirror `public/` into the output root, dotfiles included.

use anyhow::{Result, anyhow};
use std::sync::Arc;

use super::for_each_file;
use crate::builder::TaskOptions;
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::debug;
use crate::utils::fs::{copy_file, walk_files};

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let files = match options.files {
        Some(files) => files
            .into_iter()
            .filter(|f| f.starts_with(&ctx.paths.public) && f.is_file())
            .collect(),
        None => walk_files(&ctx.paths.public, true),
    };

    let count = for_each_file(&ctx, files, |ctx, file| async move {
        let target = artifact_path(
            SourceKind::Static,
            &file,
            &ctx.paths,
            ctx.config.build.image_optimization,
        )
        .ok_or_else(|| anyhow!("file outside public root"))?;
        copy_file(&file, &target).await
    })
    .await?;
    debug!("copy"; "copied {} file(s)", count);
    Ok(())
}
