//! Template task: `.tpl` pages → formatted `.html`.
//!
//! Compiled templates are cached per session in development. On a cache
//! miss the page is compiled and its dependency edges are replaced with the
//! includes found this time, so editing a partial can find every page that
//! inlines it.

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{blocking, for_each_file, sources};
use crate::builder::TaskOptions;
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::debug;
use crate::transform::size::image_size;
use crate::transform::{BuilderVars, CompiledTemplate, compile_file, format_html};
use crate::utils::fs::write_file;

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let scoped = options.files.is_some();
    let mut pages = sources(&ctx, SourceKind::Template, &options);

    // Unscoped dev runs skip pages whose content is unchanged; partial edits
    // arrive scoped from the watcher.
    if ctx.mode.is_dev() && !scoped {
        pages = ctx.cache.filter_changed(pages).await;
    }

    let count = for_each_file(&ctx, pages, render_page).await?;
    debug!("template"; "rendered {} page(s)", count);
    Ok(())
}

async fn render_page(ctx: Arc<BuildContext>, page: PathBuf) -> Result<()> {
    let output = artifact_path(
        SourceKind::Template,
        &page,
        &ctx.paths,
        ctx.config.build.image_optimization,
    )
    .ok_or_else(|| anyhow!("template outside source root"))?;

    let html = {
        let ctx = Arc::clone(&ctx);
        blocking(move || render(&ctx, &page)).await?
    };
    write_file(&output, html).await
}

fn render(ctx: &BuildContext, page: &Path) -> Result<String> {
    let template = load(ctx, page)?;
    let vars = BuilderVars::for_page(page, &ctx.paths, &ctx.config);
    let html = template.render(&vars, |src| image_size(src, page, &ctx.paths))?;
    Ok(format_html(&html))
}

/// Cached template, or a fresh compile that also rewires the graph.
fn load(ctx: &BuildContext, page: &Path) -> Result<Arc<CompiledTemplate>> {
    if let Some(template) = ctx.cache.get_template(page) {
        return Ok(template);
    }

    let compiled = Arc::new(compile_file(page, &ctx.paths.src)?);
    {
        let mut graph = ctx.graph.write();
        graph.clear_dependencies(page);
        for dependency in compiled.dependencies() {
            graph.add_dependency(page, dependency);
        }
    }
    ctx.cache.set_template(page, Arc::clone(&compiled));
    Ok(compiled)
}
