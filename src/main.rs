//! Pagekit - a task-based static site builder with a live-reload dev server.

mod builder;
mod cli;
mod compiler;
mod config;
mod core;
mod freshness;
mod logger;
mod reload;
mod tasks;
mod transform;
mod utils;
mod watch;

#[cfg(test)]
mod testing;

use clap::{ColorChoice, Parser};
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match cli::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log!("error"; "{:#}", e);
            ExitCode::FAILURE
        }
    }
}
