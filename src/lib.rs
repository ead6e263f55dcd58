//! Path-template resource mappings with MIME negotiation and staged request
//! dispatch.
//!
//! Services are described as resources: path templates like `notes/{id}` or
//! `files/{path*}`, each with per-verb handler configurations that declare
//! the media types they consume and produce and the callbacks to run. An
//! [`HttpController`] routes every request to the best matching template,
//! negotiates a handler against the `Accept` and `Content-Type` headers and
//! drives it through `before`, `serve`, `catch` and `finally`. Failures are
//! answered with a uniform JSON (or plain text, for HTML clients) error body.
//!
//! # Features
//!
//! - Literal templates outrank parameterized ones; among parameterized
//!   matches the one with fewer placeholders wins
//! - Wildcard-aware MIME matching (`*/json`, `text/*`, `*/*`)
//! - Handler entries merged or appended by their exact MIME constraints
//! - HTTP/1.x request parsing and a small tokio server hosting a controller
//!
//! # Examples
//!
//! ## Dispatching a request
//!
//! ```
//! use microrest_rs::rest::{HttpController, ResourceMappings};
//! use microrest_rs::{parse_request, HttpResponse, StatusCode};
//!
//! let mut mappings = ResourceMappings::new();
//! mappings.resource("notes/count").get().serve(|exchange| {
//!     exchange.send_json(StatusCode::Ok, &serde_json::json!({ "count": 3 }))
//! });
//! mappings.resource("notes/{id}").get().serve(|exchange| {
//!     let id = exchange.path_parameter("id").unwrap_or_default().to_string();
//!     exchange.send_json(StatusCode::Ok, &serde_json::json!({ "id": id }))
//! });
//!
//! let controller = HttpController::new(mappings);
//!
//! let request = parse_request(b"GET /notes/count HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//! let mut response = HttpResponse::default();
//! controller.execute(&request, &mut response).unwrap();
//! assert_eq!(response.body_text(), r#"{"count":3}"#);
//! ```
//!
//! ## Error handling
//!
//! ```
//! use microrest_rs::rest::{HandlerError, HttpController, ResourceMappings};
//! use microrest_rs::{parse_request, HttpResponse, StatusCode};
//!
//! let mut mappings = ResourceMappings::new();
//! mappings
//!     .resource("notes")
//!     .post()
//!     .consumes(["application/json"])
//!     .unwrap()
//!     .serve(|_| Err(HandlerError::with_status_code(StatusCode::Conflict, "note exists")));
//!
//! let controller = HttpController::new(mappings);
//! let request = parse_request(
//!     b"POST /notes HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\r\n{}",
//! )
//! .unwrap();
//! let mut response = HttpResponse::default();
//! controller.execute(&request, &mut response).unwrap();
//!
//! assert_eq!(response.status, StatusCode::Conflict);
//! assert_eq!(response.body_json().unwrap()["error"], "Conflict");
//! ```
//!
//! See the `demos` directory for a complete service hosted by [`HttpServer`].

pub mod mime;

pub mod parser;

pub mod rest;

pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use rest::{HandlerError, HttpController, ResourceMappings};
pub use server::{Error as ServerError, HttpResponse, HttpServer, ServerConfig, StatusCode};
