//! Site configuration management for `pagekit.toml`.
//!
//! # Sections
//!
//! | Section    | Purpose                                          |
//! |------------|--------------------------------------------------|
//! | (root)     | `site_url`, `subdir`, `out_dir`, `debug`         |
//! | `[server]` | Development server (port, host, start path)      |
//! | `[build]`  | Raster image strategy and encoder options        |
//!
//! A missing config file means "all defaults". A config that cannot be read
//! or parsed is reported as a warning and also falls back to the defaults,
//! so a typo never prevents the dev server from starting.

pub mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{BuildConfig, ImageOptions, ImageStrategy, PngLevel, ServerConfig, WebpOptions};

use crate::log;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file name looked up in the project root.
pub const CONFIG_FILE: &str = "pagekit.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing pagekit.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Public origin of the deployed site, e.g. `https://example.com`.
    pub site_url: String,

    /// Subdirectory the site is deployed under, e.g. `docs`.
    pub subdir: String,

    /// Output directory, relative to the project root.
    pub out_dir: PathBuf,

    /// Keep readable output (expanded CSS, unminified JS) in development.
    pub debug: bool,

    /// Development server settings
    pub server: ServerConfig,

    /// Build settings
    pub build: BuildConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            site_url: String::new(),
            subdir: String::new(),
            out_dir: PathBuf::from("dist"),
            debug: false,
            server: ServerConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration for the project rooted at `root`.
    ///
    /// Never fails: unreadable or malformed files fall back to defaults.
    pub fn load(root: &Path) -> Self {
        let path = root.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            Self::from_path(&path).unwrap_or_else(|err| {
                log!("warning"; "{}: {:#}", CONFIG_FILE, anyhow::Error::from(err));
                log!("warning"; "falling back to default configuration");
                Self::default()
            })
        } else {
            Self::default()
        };

        config.root = root.to_path_buf();
        config
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let (config, ignored) = Self::parse_with_ignored(content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored);
        }
        config.validate()?;
        Ok(config)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String]) {
        log!("warning"; "unknown fields in {}, ignoring: {}", CONFIG_FILE, fields.join(", "));
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("`out_dir` must not be empty".into()));
        }
        if self.out_dir.is_absolute() {
            return Err(ConfigError::Validation(
                "`out_dir` must be relative to the project root".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("`server.port` must be non-zero".into()));
        }
        Ok(())
    }

    /// Subdirectory normalized to `/sub` form, or empty when unset.
    pub fn subdir_prefix(&self) -> String {
        let trimmed = self.subdir.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Apply command-line overrides for the dev server.
    pub fn override_server(&mut self, host: Option<String>, port: Option<u16>) {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
    }
}

/// Parse a config string for tests, panicking on malformed input.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    SiteConfig::from_str(content).expect("test config should parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.site_url, "");
        assert_eq!(config.subdir, "");
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert!(!config.debug);
    }

    #[test]
    fn test_root_fields() {
        let config = test_parse_config(
            "site_url = \"https://example.com\"\nsubdir = \"docs\"\nout_dir = \"build\"\ndebug = true",
        );
        assert_eq!(config.site_url, "https://example.com");
        assert_eq!(config.subdir, "docs");
        assert_eq!(config.out_dir, PathBuf::from("build"));
        assert!(config.debug);
    }

    #[test]
    fn test_subdir_prefix() {
        let mut config = SiteConfig::default();
        assert_eq!(config.subdir_prefix(), "");

        config.subdir = "/docs/".into();
        assert_eq!(config.subdir_prefix(), "/docs");

        config.subdir = "a/b".into();
        assert_eq!(config.subdir_prefix(), "/a/b");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config = test_parse_config("bogus = 1\n[server]\nport = 4000\nnope = true");
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_validation_rejects_zero_port() {
        let err = SiteConfig::from_str("[server]\nport = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SiteConfig::load(dir.path());
        assert_eq!(config.root, dir.path());
        assert_eq!(config.out_dir, PathBuf::from("dist"));
    }

    #[test]
    fn test_load_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "server = [not toml").unwrap();

        let config = SiteConfig::load(dir.path());
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.root, dir.path());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "subdir = \"blog\"\n").unwrap();

        let config = SiteConfig::load(dir.path());
        assert_eq!(config.subdir, "blog");
    }

    #[test]
    fn test_override_server() {
        let mut config = SiteConfig::default();
        config.override_server(Some("0.0.0.0".into()), None);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5555);

        config.override_server(None, Some(9000));
        assert_eq!(config.server.port, 9000);
    }
}
