//! Command-line interface module.
//!
//! Each command resolves the project root, loads `pagekit.toml`, builds a
//! [`BuildContext`] with the built-in task slots and hands it to the
//! [`Builder`].

mod args;

pub use args::{Cli, Commands};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::{Builder, TaskOptions};
use crate::config::SiteConfig;
use crate::core::{BuildContext, BuildMode, setup_shutdown_handler};
use crate::tasks::default_slots;

/// Run one parsed command to completion on a fresh runtime.
pub fn run(cli: &Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command() {
        Commands::Dev { root, host, port } => {
            let mut config = load_config(&root.root)?;
            config.override_server(host, port);
            runtime.block_on(dev(config))
        }
        Commands::Build { root } => runtime.block_on(build(load_config(&root.root)?)),
        Commands::Sprite { root } => runtime.block_on(sprite(load_config(&root.root)?)),
    }
}

/// Watch, rebuild and serve until Ctrl+C.
async fn dev(config: SiteConfig) -> Result<()> {
    let ctx = context(config, BuildMode::Development);
    setup_shutdown_handler(ctx.shutdown.clone())?;
    Builder::new(ctx).watch().await
}

/// One clean production build.
async fn build(config: SiteConfig) -> Result<()> {
    Builder::new(context(config, BuildMode::Production)).build().await
}

/// Regenerate every icon sprite, leaving other output untouched.
async fn sprite(config: SiteConfig) -> Result<()> {
    let builder = Builder::new(context(config, BuildMode::Production));
    builder.run_task("sprite", TaskOptions::all()).await
}

fn context(config: SiteConfig, mode: BuildMode) -> Arc<BuildContext> {
    Arc::new(BuildContext::new(config, mode, default_slots()))
}

/// Notify reports absolute paths, so the root is made absolute up front.
fn load_config(root: &Path) -> Result<SiteConfig> {
    let root = absolute_root(root)?;
    Ok(SiteConfig::load(&root))
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("project root {} not found", root.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("nope")).unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("site")).unwrap();
        let config = load_config(&dir.path().join("site/../site")).unwrap();
        assert!(config.root.is_absolute());
        assert!(config.root.ends_with("site"));
        assert_eq!(config.out_dir, PathBuf::from("dist"));
    }

    #[tokio::test]
    async fn test_build_command_produces_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/css")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::write(root.join("src/index.tpl"), "<h1>hi</h1>").unwrap();
        fs::write(root.join("src/css/site.css"), ".a { color: red; }").unwrap();
        fs::write(root.join("public/robots.txt"), "User-agent: *").unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("dist/stale.html"), "old").unwrap();

        build(SiteConfig::load(&root)).await.unwrap();

        assert!(root.join("dist/index.html").is_file());
        assert!(root.join("dist/css/site.css").is_file());
        assert!(root.join("dist/robots.txt").is_file());
        assert!(!root.join("dist/stale.html").exists());
    }

    #[tokio::test]
    async fn test_sprite_command_only_writes_sprites() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("src/icons")).unwrap();
        fs::write(
            root.join("src/icons/dot.svg"),
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><circle cx="5" cy="5" r="4" fill="red"/></svg>"#,
        )
        .unwrap();
        fs::write(root.join("src/index.tpl"), "<p>x</p>").unwrap();

        sprite(SiteConfig::load(&root)).await.unwrap();

        let sprite = fs::read_to_string(root.join("dist/icons.svg")).unwrap();
        assert!(sprite.contains(r#"id="dot""#), "{sprite}");
        assert!(!root.join("dist/index.html").exists());
    }
}
