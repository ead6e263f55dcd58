//! Server configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::server::error::Error;

/// HTTP server configuration.
///
/// Missing fields take their default values when deserialized:
///
/// ```
/// use microrest_rs::ServerConfig;
///
/// let config = ServerConfig::from_json(r#"{ "addr": "0.0.0.0:9000", "context_path": "/api" }"#).unwrap();
/// assert_eq!(config.addr.port(), 9000);
/// assert_eq!(config.max_connections, 1024);
/// assert_eq!(config.context_path, "/api");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// Path prefix under which the resource mappings are mounted.
    ///
    /// Stripped from request paths before routing. Empty or `/` mounts the
    /// mappings at the root.
    pub context_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1024,
            read_buffer_size: 8192,
            context_path: String::new(),
        }
    }
}

impl ServerConfig {
    /// Reads a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(Error::ConfigError)
    }
}
