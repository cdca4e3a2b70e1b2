//! Configuration section definitions.

mod build;
mod server;

pub use build::{BuildConfig, ImageOptions, ImageStrategy, PngLevel, WebpOptions};
pub use server::ServerConfig;
