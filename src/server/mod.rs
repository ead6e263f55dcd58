//! HTTP server hosting an [`HttpController`](crate::rest::HttpController).
//!
//! Accepts connections with tokio, parses each request with
//! [`crate::parser`] and dispatches it through the controller, which answers
//! into a buffered [`HttpResponse`].

mod response;
mod config;
mod error;
mod http_server;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use http_server::{strip_context_path, HttpServer};
