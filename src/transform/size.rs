//! `{{ size "img.png" }}` helper: image dimensions from the file header.

use std::path::{Path, PathBuf};

use crate::core::Paths;
use crate::log;

/// Dimensions of an image referenced from `page`.
///
/// `/`-prefixed sources resolve against the source root, others against the
/// page's directory. When the file is not in the source tree its mirror
/// under the public root is tried. Missing or unreadable images warn and
/// yield `None`.
pub fn image_size(src: &str, page: &Path, paths: &Paths) -> Option<(u32, u32)> {
    let resolved = resolve(src, page, paths);
    let Some(found) = find_image(&resolved, paths) else {
        log!("warning"; "image not found: {}", src);
        return None;
    };

    match image::image_dimensions(&found) {
        Ok(size) => Some(size),
        Err(e) => {
            log!("warning"; "failed to read image size of {}: {}", src, e);
            None
        }
    }
}

/// Render dimensions as HTML attributes, empty when unknown.
pub fn size_attrs(size: Option<(u32, u32)>) -> String {
    size.map(|(w, h)| format!("width=\"{w}\" height=\"{h}\""))
        .unwrap_or_default()
}

fn resolve(src: &str, page: &Path, paths: &Paths) -> PathBuf {
    let target = match src.strip_prefix('/') {
        Some(rooted) => paths.src.join(rooted),
        None => page.parent().unwrap_or(&paths.src).join(src),
    };
    crate::utils::path::normalize_lexical(&target)
}

fn find_image(resolved: &Path, paths: &Paths) -> Option<PathBuf> {
    if resolved.is_file() {
        return Some(resolved.to_path_buf());
    }
    let mirrored = paths.public.join(paths.relative_to_src(resolved)?);
    mirrored.is_file().then_some(mirrored)
}
