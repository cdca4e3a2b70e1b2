//! Style task: bundle each non-partial stylesheet with its `@import` chain.
//!
//! Readable output also gets a source map whose sources are relative to
//! the entry's directory, with their content embedded.

use anyhow::{Context, Result, anyhow};
use lightningcss::bundler::{Bundler, FileProvider};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions};
use parcel_sourcemap::SourceMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Emitted, MapComment, blocking, for_each_file, sources, write_emitted};
use crate::builder::TaskOptions;
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::debug;

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let sheets = sources(&ctx, SourceKind::Style, &options);
    let count = for_each_file(&ctx, sheets, build_sheet).await?;
    debug!("style"; "compiled {} stylesheet(s)", count);
    Ok(())
}

async fn build_sheet(ctx: Arc<BuildContext>, sheet: PathBuf) -> Result<()> {
    let output = artifact_path(
        SourceKind::Style,
        &sheet,
        &ctx.paths,
        ctx.config.build.image_optimization,
    )
    .ok_or_else(|| anyhow!("stylesheet outside source root"))?;

    let minify = ctx.minify();
    let with_map = ctx.source_maps();
    let css = blocking(move || bundle(&sheet, minify, with_map)).await?;
    write_emitted(&output, css, MapComment::Css).await
}

/// Inline every `@import` reachable from `entry` and print the result.
pub fn bundle(entry: &Path, minify: bool, with_map: bool) -> Result<Emitted> {
    let root = entry.parent().unwrap_or(entry).to_string_lossy();
    let mut source_map = with_map.then(|| SourceMap::new(&root));

    let provider = FileProvider::new();
    let mut bundler = Bundler::new(&provider, source_map.as_mut(), ParserOptions::default());
    let stylesheet = bundler.bundle(entry).map_err(|e| anyhow!("{e}"))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify,
            source_map: source_map.as_mut(),
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))?;

    let map = source_map
        .as_mut()
        .map(|map| map.to_json(None))
        .transpose()
        .context("failed to serialize source map")?;
    Ok(Emitted {
        code: printed.code,
        map,
    })
}
