//! MIME type detection for the dev server.

use std::path::Path;

/// MIME types the dev server names directly.
pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const EVENT_STREAM: &str = "text/event-stream";
    pub const SVG: &str = "image/svg+xml";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Extension → type, for everything a built site usually contains.
const BY_EXTENSION: &[(&str, &str)] = &[
    ("html", types::HTML),
    ("htm", types::HTML),
    ("css", types::CSS),
    ("js", types::JAVASCRIPT),
    ("mjs", types::JAVASCRIPT),
    ("json", "application/json"),
    ("map", "application/json"),
    ("xml", "application/xml"),
    ("txt", types::PLAIN),
    ("svg", types::SVG),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("ico", "image/x-icon"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("pdf", "application/pdf"),
    ("wasm", "application/wasm"),
];

/// Content type for a file, by extension (case-insensitive).
pub fn from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| {
            BY_EXTENSION
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        })
        .map_or(types::OCTET_STREAM, |(_, mime)| mime)
}

#[inline]
pub fn is_html(mime: &str) -> bool {
    mime.starts_with("text/html")
}

/// Stylesheets and scripts change on every rebuild and must be revalidated.
#[inline]
pub fn needs_revalidation(mime: &str) -> bool {
    mime == types::CSS || mime == types::JAVASCRIPT
}
