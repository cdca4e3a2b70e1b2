//! Live-update events and their event-stream wire form.

/// Fixed endpoint the injected client subscribes to.
pub const EVENTS_PATH: &str = "/__pagekit/events";

/// Reconnect interval advertised to clients, in milliseconds.
pub const RETRY_MS: u64 = 1000;

/// Notification pushed to connected browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveEvent {
    /// Full page reload
    Reload,
    /// Re-fetch stylesheets without reloading
    CssUpdate,
}

impl LiveEvent {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reload => "reload",
            Self::CssUpdate => "css-update",
        }
    }

    /// `event: <name>\ndata: \n\n`
    pub fn to_frame(self) -> String {
        format!("event: {}\ndata: \n\n", self.name())
    }
}

/// First frame of every stream: the reconnect interval.
pub fn retry_frame() -> String {
    format!("retry: {RETRY_MS}\n\n")
}

/// Comment frame keeping idle connections alive and exposing dead ones.
pub const HEARTBEAT_FRAME: &str = ": ping\n\n";
