//! Source path → output artifact path derivation.
//!
//! One rule per [`SourceKind`]. The same functions are used when writing an
//! artifact and when deleting it after its source disappears, so a raster
//! re-encoded under the active [`ImageStrategy`] is removed by its encoded
//! name rather than the source name.

use std::path::{Path, PathBuf};

use super::{Paths, SourceKind};
use crate::config::ImageStrategy;

/// Artifact path for `source`, or `None` when it lives outside the roots
/// its category is read from.
pub fn artifact_path(
    kind: SourceKind,
    source: &Path,
    paths: &Paths,
    strategy: ImageStrategy,
) -> Option<PathBuf> {
    if kind == SourceKind::Static {
        return paths.relative_to_public(source).map(|rel| paths.dist.join(rel));
    }

    let rel = paths.relative_to_src(source)?;
    let target = paths.dist.join(rel);
    Some(match artifact_extension(kind, source, strategy) {
        Some(ext) => target.with_extension(ext),
        None => target,
    })
}

/// Extension the artifact carries, `None` meaning "same as the source".
fn artifact_extension(kind: SourceKind, source: &Path, strategy: ImageStrategy) -> Option<&'static str> {
    let is_ts = source
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ts"));

    match kind {
        SourceKind::Template => Some("html"),
        SourceKind::Style => Some("css"),
        SourceKind::Script if is_ts => Some("js"),
        SourceKind::Raster => strategy.target_extension(),
        SourceKind::Script | SourceKind::Vector | SourceKind::Static => None,
    }
}

/// Sprite artifact for an icon directory: `src/a/icons` → `dist/a/icons.svg`.
pub fn sprite_path(icons_dir: &Path, paths: &Paths) -> Option<PathBuf> {
    let rel = paths.relative_to_src(icons_dir)?;
    Some(paths.dist.join(rel).with_extension("svg"))
}

/// Source map written next to a compiled artifact: `app.css` → `app.css.map`.
pub fn source_map_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

/// Only compiled stylesheets and scripts ever carry a source map.
pub fn has_source_map(kind: SourceKind) -> bool {
    matches!(kind, SourceKind::Style | SourceKind::Script)
}
