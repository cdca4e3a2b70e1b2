//! Live Reload Module
//!
//! Pushes change notifications to connected browsers over a one-way
//! event stream.
//!
//! # Architecture
//!
//! ```text
//! watch::router ─ notify ─> LiveChannel ─> event-stream threads ─> Browser
//!                                                 (server)
//! ```
//!
//! # Modules
//!
//! - `channel` - Subscriber fan-out
//! - `inject` - Client script injection into HTML responses
//! - `message` - Event types and their wire frames
//! - `path` - URL to file resolution for the dev server
//! - `server` - Development HTTP server

mod channel;
pub mod inject;
pub mod message;
pub mod path;
pub mod server;

pub use channel::LiveChannel;
pub use message::LiveEvent;
