//! Per-page builder variables exposed to templates as `{{ name }}`.

use std::path::{Component, Path};

use crate::config::SiteConfig;
use crate::core::Paths;

/// URL parts of the page being rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlVars {
    /// `site_url` without trailing slash
    pub origin: String,
    /// origin + subdir
    pub base: String,
    /// `/`, `/about/` or `/blog/post.html`
    pub pathname: String,
    /// base + pathname
    pub href: String,
}

/// Variables computed from a page's position in the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderVars {
    /// Relative prefix back to the site root: `./` or `../` per level
    pub dir: String,
    /// `/sub` or empty
    pub subdir: String,
    pub url: UrlVars,
}

impl BuilderVars {
    pub fn for_page(page: &Path, paths: &Paths, config: &SiteConfig) -> Self {
        let segments: Vec<String> = paths
            .relative_to_src(page)
            .unwrap_or(page)
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        let depth = segments.len().saturating_sub(1);
        let dir = if depth == 0 {
            "./".to_string()
        } else {
            "../".repeat(depth)
        };

        let subdir = config.subdir_prefix();
        let origin = config.site_url.trim_end_matches('/').to_string();
        let base = format!("{origin}{subdir}");
        let pathname = page_pathname(&segments);
        let href = format!("{base}{pathname}");

        Self {
            dir,
            subdir,
            url: UrlVars {
                origin,
                base,
                pathname,
                href,
            },
        }
    }

    /// Look up a variable by its template name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "dir" => Some(&self.dir),
            "subdir" => Some(&self.subdir),
            "url.origin" => Some(&self.url.origin),
            "url.base" => Some(&self.url.base),
            "url.pathname" => Some(&self.url.pathname),
            "url.href" => Some(&self.url.href),
            _ => None,
        }
    }
}

/// `index.tpl` maps to its directory URL, anything else to `.html`.
fn page_pathname(segments: &[String]) -> String {
    let Some((file, dirs)) = segments.split_last() else {
        return "/".to_string();
    };

    let mut url = String::from("/");
    for dir in dirs {
        url.push_str(dir);
        url.push('/');
    }

    if file != "index.tpl" {
        let stem = file.strip_suffix(".tpl").unwrap_or(file);
        url.push_str(stem);
        url.push_str(".html");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn vars(page: &str, site_url: &str, subdir: &str) -> BuilderVars {
        let config = SiteConfig {
            root: PathBuf::from("/site"),
            site_url: site_url.into(),
            subdir: subdir.into(),
            ..SiteConfig::default()
        };
        let paths = Paths::from_config(&config);
        BuilderVars::for_page(Path::new(page), &paths, &config)
    }

    #[test]
    fn test_root_index() {
        let v = vars("/site/src/index.tpl", "https://example.com/", "");
        assert_eq!(v.dir, "./");
        assert_eq!(v.subdir, "");
        assert_eq!(v.url.origin, "https://example.com");
        assert_eq!(v.url.base, "https://example.com");
        assert_eq!(v.url.pathname, "/");
        assert_eq!(v.url.href, "https://example.com/");
    }

    #[test]
    fn test_nested_page() {
        let v = vars("/site/src/blog/2024/post.tpl", "https://example.com", "/docs/");
        assert_eq!(v.dir, "../../");
        assert_eq!(v.subdir, "/docs");
        assert_eq!(v.url.base, "https://example.com/docs");
        assert_eq!(v.url.pathname, "/blog/2024/post.html");
        assert_eq!(v.url.href, "https://example.com/docs/blog/2024/post.html");
    }

    #[test]
    fn test_nested_index() {
        let v = vars("/site/src/about/index.tpl", "", "");
        assert_eq!(v.dir, "../");
        assert_eq!(v.url.pathname, "/about/");
        assert_eq!(v.url.href, "/about/");
    }

    #[test]
    fn test_lookup() {
        let v = vars("/site/src/index.tpl", "https://a.b", "");
        assert_eq!(v.get("url.origin"), Some("https://a.b"));
        assert_eq!(v.get("dir"), Some("./"));
        assert_eq!(v.get("nope"), None);
    }
}
