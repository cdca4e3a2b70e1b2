//! Utility modules shared across tasks, watcher and server.

pub mod fs;
pub mod mime;
pub mod path;
