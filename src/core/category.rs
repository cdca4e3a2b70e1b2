//! Source file categories.
//!
//! Every path under the project resolves to at most one [`SourceKind`].
//! Classification checks, in order: public-root membership, template, style,
//! script (declaration files excluded), vector (icon-sprite sources
//! excluded), raster. The first match wins.

use std::path::{Component, Path};

use super::Paths;

/// Directory name whose SVGs feed the icon sprite instead of the vector task.
pub const ICONS_DIR: &str = "icons";

/// Category of a source file, determines its transform and artifact rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// `.tpl` markup template
    Template,
    /// `.css` stylesheet
    Style,
    /// `.js` / `.mjs` / `.ts` script
    Script,
    /// `.jpg` / `.jpeg` / `.png` / `.gif` image
    Raster,
    /// `.svg` image outside icon directories
    Vector,
    /// Anything under the public root
    Static,
}

impl SourceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Style => "style",
            Self::Script => "script",
            Self::Raster => "image",
            Self::Vector => "vector",
            Self::Static => "static",
        }
    }

    /// Category implied by the extension alone (no location rules).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "tpl" => Some(Self::Template),
            "css" => Some(Self::Style),
            "js" | "mjs" | "ts" => Some(Self::Script),
            "svg" => Some(Self::Vector),
            "jpg" | "jpeg" | "png" | "gif" => Some(Self::Raster),
            _ => None,
        }
    }

    /// Classify a path, or `None` when no task handles it.
    pub fn classify(path: &Path, paths: &Paths) -> Option<Self> {
        if path.starts_with(&paths.public) {
            return Some(Self::Static);
        }
        if !path.starts_with(&paths.src) {
            return None;
        }

        let ext = path.extension()?.to_str()?;
        match Self::from_extension(ext)? {
            Self::Script if is_declaration(path) => None,
            Self::Vector if is_icon_source(path, paths) => None,
            kind => Some(kind),
        }
    }
}

/// Partial: the file name or any directory between the source root and the
/// file starts with `_`. Partials never produce a top-level artifact.
pub fn is_partial(path: &Path, paths: &Paths) -> bool {
    let rel = paths.relative_to_src(path).unwrap_or(path);
    rel.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('_')),
        _ => false,
    })
}

/// SVG living under an `icons` directory of the source tree.
pub fn is_icon_source(path: &Path, paths: &Paths) -> bool {
    let Some(rel) = paths.relative_to_src(path) else {
        return false;
    };
    rel.parent()
        .is_some_and(|dir| dir.components().any(|c| c.as_os_str() == ICONS_DIR))
}

/// TypeScript declaration file (`*.d.ts`), never compiled.
pub fn is_declaration(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(".d.ts"))
}
