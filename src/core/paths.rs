//! Resolved project directories.

use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::utils::path::normalize_path;

/// Source directory name under the project root.
pub const SRC_DIR: &str = "src";
/// Static-asset directory name under the project root.
pub const PUBLIC_DIR: &str = "public";

/// Absolute directories one build session reads from and writes to.
///
/// `dist` is where artifacts land (`<root>/<out_dir>/<subdir>`), while
/// `serve_root` is what the dev server exposes (`<root>/<out_dir>`), so that
/// `/<subdir>/...` URLs resolve the same way they do once deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
    pub src: PathBuf,
    pub public: PathBuf,
    pub dist: PathBuf,
    pub serve_root: PathBuf,
}

impl Paths {
    pub fn from_config(config: &SiteConfig) -> Self {
        let root = normalize_path(&config.root);
        let serve_root = root.join(&config.out_dir);
        let subdir = config.subdir.trim_matches('/');
        let dist = if subdir.is_empty() {
            serve_root.clone()
        } else {
            serve_root.join(subdir)
        };

        Self {
            src: root.join(SRC_DIR),
            public: root.join(PUBLIC_DIR),
            dist,
            serve_root,
            root,
        }
    }

    /// Path relative to the source root, if `path` lives under it.
    pub fn relative_to_src<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.src).ok()
    }

    /// Path relative to the public root, if `path` lives under it.
    pub fn relative_to_public<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.public).ok()
    }

    /// Display-friendly path relative to the project root.
    pub fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &str, subdir: &str) -> SiteConfig {
        SiteConfig {
            root: PathBuf::from(root),
            subdir: subdir.to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_paths_without_subdir() {
        let paths = Paths::from_config(&config("/site", ""));
        assert_eq!(paths.src, PathBuf::from("/site/src"));
        assert_eq!(paths.public, PathBuf::from("/site/public"));
        assert_eq!(paths.dist, PathBuf::from("/site/dist"));
        assert_eq!(paths.serve_root, paths.dist);
    }

    #[test]
    fn test_paths_with_subdir() {
        let paths = Paths::from_config(&config("/site", "/docs/"));
        assert_eq!(paths.dist, PathBuf::from("/site/dist/docs"));
        assert_eq!(paths.serve_root, PathBuf::from("/site/dist"));
    }

    #[test]
    fn test_relative_to_src() {
        let paths = Paths::from_config(&config("/site", ""));
        assert_eq!(
            paths.relative_to_src(Path::new("/site/src/a/b.tpl")),
            Some(Path::new("a/b.tpl"))
        );
        assert_eq!(paths.relative_to_src(Path::new("/site/public/a.txt")), None);
    }
}
