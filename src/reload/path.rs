//! URL to filesystem path resolution.

use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Resolve a request URL under `serve_root`.
///
/// First existing match wins: the file itself, `<dir>/index.html`, then
/// `<path>.html`. Anything escaping `serve_root` is rejected.
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let root = serve_root.canonicalize().ok()?;
    let local = root.join(&clean);

    let mut candidates = vec![local.clone(), local.join("index.html")];
    if !clean.is_empty() && !url_has_trailing_slash(url) {
        candidates.push(with_html_suffix(&local));
    }

    candidates.into_iter().find_map(|candidate| {
        // Canonicalize to catch symlinks pointing outside the root
        let canonical = candidate.canonicalize().ok()?;
        (canonical.starts_with(&root) && canonical.is_file()).then_some(canonical)
    })
}

/// Decoded URL path without query, fragment or surrounding slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}

/// `/v1.2` maps to `v1.2.html`, so the suffix is appended, never swapped in.
fn with_html_suffix(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".html");
    PathBuf::from(name)
}

fn url_has_trailing_slash(url: &str) -> bool {
    url.split(['?', '#']).next().unwrap_or_default().ends_with('/')
}

/// Request path without query string, for routing.
pub fn route_of(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
