//! Terminal output with colored prefixes.
//!
//! - `log!` prints one line under a `[module]` prefix
//! - `debug!` does the same, only with `--verbose`
//! - `status_success` / `status_error` report the outcome of a watch
//!   rebuild as a timestamped block that replaces the previous one, as
//!   long as nothing else was printed in between
//!
//! ```ignore
//! log!("build"; "done in {}ms", elapsed);
//! debug!("watch"; "raw notify: {:?}", event.kind);
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

/// Set by `--verbose`.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Height of the last status block, zero once a plain line followed it.
static STATUS_LINES: Mutex<usize> = Mutex::new(0);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Log a message with a colored module prefix
///
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let mut status = STATUS_LINES.lock();
    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
    // The status block is no longer the last thing on screen
    *status = 0;
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warning" => prefix.bright_magenta().bold().to_string(),
        "build" => prefix.bright_cyan().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

/// Wall-clock time (UTC) as HH:MM:SS
fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Lines a message occupies on the terminal
fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

fn status_text(summary: &str, detail: &str) -> String {
    if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    }
}

fn show_status(symbol: String, message: &str) {
    let mut status = STATUS_LINES.lock();
    let mut stdout = stdout().lock();

    if *status > 0 {
        let lines = u16::try_from(*status).unwrap_or(u16::MAX);
        execute!(stdout, cursor::MoveUp(lines), Clear(ClearType::FromCursorDown)).ok();
    }

    let time = format!("[{}]", timestamp()).dimmed().to_string();
    writeln!(stdout, "{time} {symbol} {message}").ok();
    stdout.flush().ok();

    *status = line_count(message);
}

/// Report a successful watch rebuild (✓, green).
pub fn status_success(message: &str) {
    show_status("✓".green().to_string(), message);
}

/// Report a failed watch rebuild (✗, red) with the error chain below it.
pub fn status_error(summary: &str, detail: &str) {
    show_status("✗".red().to_string(), &status_text(summary, detail));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count() {
        assert_eq!(line_count("modified src/index.tpl"), 1);
        let message = status_text("failed to process src/index.tpl", "template task failed\n  boom");
        assert_eq!(line_count(&message), 3);
    }

    #[test]
    fn test_status_text_without_detail() {
        assert_eq!(status_text("modified a.css", ""), "modified a.css");
    }

    #[test]
    fn test_timestamp_format() {
        let time = timestamp();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }
}
