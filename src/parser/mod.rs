//! HTTP parser module.
//!
//! Parses raw HTTP/1.x requests into [`HttpRequest`] values, which serve as
//! the request side of a dispatch through [`crate::rest::HttpController`].

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
