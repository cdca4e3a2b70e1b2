//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Pagekit static site builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands (default: dev)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build, watch and serve with live reload
    #[command(visible_alias = "watch")]
    Dev {
        #[command(flatten)]
        root: RootArg,

        /// Host name to bind and advertise (e.g., localhost, 0.0.0.0)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build the site for production
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        root: RootArg,
    },

    /// Generate icon sprites only
    Sprite {
        #[command(flatten)]
        root: RootArg,
    },
}

/// Project root shared by every command.
#[derive(clap::Args, Debug, Clone)]
pub struct RootArg {
    /// Project root directory (contains pagekit.toml, src/, public/)
    #[arg(default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,
}

impl Cli {
    /// The subcommand to run; bare `pagekit` means `pagekit dev .`.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Dev {
            root: RootArg {
                root: PathBuf::from("."),
            },
            host: None,
            port: None,
        })
    }
}
