//! Vector task: parse and re-serialize SVGs with usvg, which drops
//! comments, editor metadata and unused definitions.

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use super::{blocking, for_each_file, sources};
use crate::builder::TaskOptions;
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::debug;
use crate::utils::fs::write_file;

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let svgs = sources(&ctx, SourceKind::Vector, &options);
    let count = for_each_file(&ctx, svgs, build_svg).await?;
    debug!("vector"; "optimized {} svg(s)", count);
    Ok(())
}

async fn build_svg(ctx: Arc<BuildContext>, source: PathBuf) -> Result<()> {
    let output = artifact_path(
        SourceKind::Vector,
        &source,
        &ctx.paths,
        ctx.config.build.image_optimization,
    )
    .ok_or_else(|| anyhow!("svg outside source root"))?;

    let optimized = blocking(move || {
        let data = fs::read(&source).with_context(|| format!("failed to read {}", source.display()))?;
        optimize(&data)
    })
    .await?;
    write_file(&output, optimized).await
}

/// Minified SVG markup.
pub fn optimize(data: &[u8]) -> Result<String> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default()).context("failed to parse SVG")?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    Ok(tree.to_string(&write_options))
}
