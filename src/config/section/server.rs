//! `[server]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "localhost"      # Interface to bind (use "0.0.0.0" for LAN access)
//! port = 5555             # HTTP port number
//! start_path = "/"        # Page opened in the browser
//! open = false            # Open the browser once the server is up
//! ```

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP port number.
    pub port: u16,

    /// Host name or address to bind.
    pub host: String,

    /// Path opened in the browser, relative to the site base.
    pub start_path: String,

    /// Open the browser after the server starts.
    pub open: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5555,
            host: "localhost".to_string(),
            start_path: "/".to_string(),
            open: false,
        }
    }
}

impl ServerConfig {
    /// Address string accepted by the HTTP listener.
    ///
    /// `localhost` is bound as the IPv4 loopback to avoid dual-stack surprises.
    pub fn bind_host(&self) -> &str {
        match self.host.as_str() {
            "localhost" => "127.0.0.1",
            other => other,
        }
    }
}
