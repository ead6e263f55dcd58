//! Resource mappings and request dispatch.
//!
//! Resources are path templates such as `users/{id}` or `files/{path*}`.
//! Each resource holds, per HTTP verb, an ordered list of handler
//! configurations with optional `consumes`/`produces` MIME constraints and
//! `before`, `serve`, `catch` and `finally` callbacks. Once built, a
//! [`ResourceMappings`] is handed to an [`HttpController`], which routes
//! each request to the best matching template, picks the first handler whose
//! constraints fit the request's `Accept` and `Content-Type` headers, and
//! runs its callbacks.
//!
//! ```
//! use microrest_rs::rest::{HttpController, ResourceMappings};
//! use microrest_rs::{parse_request, HttpResponse, StatusCode};
//!
//! let mut mappings = ResourceMappings::new();
//! mappings.resource("greetings/{name}").get().serve(|exchange| {
//!     let name = exchange.path_parameter("name").unwrap_or("stranger").to_string();
//!     exchange.send_text(StatusCode::Ok, &format!("Hello, {name}!"));
//!     Ok(())
//! });
//!
//! let controller = HttpController::new(mappings);
//! let request = parse_request(b"GET /greetings/ada HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//! let mut response = HttpResponse::default();
//! controller.execute(&request, &mut response).unwrap();
//!
//! assert_eq!(response.status, StatusCode::Ok);
//! assert_eq!(response.body_text(), "Hello, ada!");
//! ```

mod context;
mod controller;
mod error;
mod exchange;
mod mappings;
mod method;
mod resource;
mod router;
mod tests;

// Re-export public items
pub use context::RequestContext;
pub use controller::{HttpController, Phase, PhaseObserver, DEFAULT_LOG_TARGET};
pub use error::{Chain, DispatchError, HandlerError, MappingError};
pub use exchange::{Exchange, Request, Response};
pub use mappings::{HandlerDescriptor, MappingsDescriptor, ResourceMappings};
pub use method::{
    callback, catch_callback, Callback, CatchCallback, HandlerConfiguration, HandlerResult, ResourceMethod,
    RouteHandler,
};
pub use resource::Resource;
pub use router::{placeholder_count, translate, RouteMatch, Router};
