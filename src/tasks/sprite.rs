//! Sprite task: every `icons` directory under the source root becomes one
//! SVG of `<symbol>` elements, referenced as `icons.svg#<name>`.
//!
//! ```text
//! src/ui/icons/home.svg  ─┐
//! src/ui/icons/menu.svg  ─┴→ dist/ui/icons.svg
//! ```
//!
//! Fills and strokes are forced to `currentColor` (except `none`) so icons
//! take the color of the surrounding text.

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use super::{blocking, for_each_file};
use crate::builder::TaskOptions;
use crate::core::{BuildContext, ICONS_DIR, Paths, is_icon_source, sprite_path};
use crate::debug;
use crate::utils::fs::{walk_files, write_file};

static SVG_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg>").expect("valid regex"));
static PAINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\b(fill|stroke)="([^"]*)""#).expect("valid regex"));

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let groups = icon_groups(&ctx.paths, options.files.as_deref());
    let dirs: Vec<PathBuf> = groups.keys().cloned().collect();
    let groups = Arc::new(groups);

    let count = for_each_file(&ctx, dirs, move |ctx, dir| {
        let groups = Arc::clone(&groups);
        async move {
            let output = sprite_path(&dir, &ctx.paths).ok_or_else(|| anyhow!("icons outside source root"))?;
            let icons = groups.get(&dir).cloned().unwrap_or_default();
            let sprite = blocking(move || build_sprite(&icons)).await?;
            write_file(&output, sprite).await
        }
    })
    .await?;
    debug!("sprite"; "generated {} sprite(s)", count);
    Ok(())
}

/// Icon files grouped by their `icons` directory.
///
/// When scoped, only directories containing one of `files` are rebuilt, but
/// always from their full current contents.
fn icon_groups(paths: &Paths, files: Option<&[PathBuf]>) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let is_svg = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
    };

    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in walk_files(&paths.src, false) {
        if !is_svg(&file) || !is_icon_source(&file, paths) {
            continue;
        }
        if let Some(dir) = icons_dir(&file) {
            groups.entry(dir.to_path_buf()).or_default().push(file);
        }
    }

    if let Some(files) = files {
        let wanted: Vec<&Path> = files.iter().filter_map(|f| icons_dir(f)).collect();
        groups.retain(|dir, _| wanted.contains(&dir.as_path()));
    }
    groups
}

/// Nearest ancestor directory named `icons`.
fn icons_dir(file: &Path) -> Option<&Path> {
    file.ancestors()
        .skip(1)
        .find(|dir| dir.file_name().is_some_and(|n| n == ICONS_DIR))
}

/// Sprite document for a set of icon files.
pub fn build_sprite(icons: &[PathBuf]) -> Result<String> {
    let mut out = String::from(r#"<svg xmlns="http://www.w3.org/2000/svg" style="display:none">"#);
    for icon in icons {
        let id = icon
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("invalid icon name {}", icon.display()))?;
        let data = fs::read(icon).with_context(|| format!("failed to read {}", icon.display()))?;
        out.push_str(&symbol(id, &data).with_context(|| format!("invalid icon {}", icon.display()))?);
    }
    out.push_str("</svg>\n");
    Ok(out)
}

fn symbol(id: &str, data: &[u8]) -> Result<String> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default()).context("failed to parse SVG")?;
    let svg = tree.to_string(&usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    });

    let captures = SVG_ROOT
        .captures(&svg)
        .ok_or_else(|| anyhow!("no <svg> root element"))?;
    let size = tree.size();
    let view_box = attr(&captures[1], "viewBox")
        .unwrap_or_else(|| format!("0 0 {} {}", size.width(), size.height()));

    let body = PAINT.replace_all(&captures[2], |c: &regex::Captures| {
        if &c[2] == "none" {
            c[0].to_string()
        } else {
            format!("{}=\"currentColor\"", &c[1])
        }
    });
    Ok(format!(r#"<symbol id="{id}" viewBox="{view_box}">{body}</symbol>"#))
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = attrs.find(&needle)? + needle.len();
    let len = attrs[start..].find('"')?;
    Some(attrs[start..start + len].to_string())
}
