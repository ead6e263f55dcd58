//! Error types for resource mappings and request dispatch.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use crate::server::StatusCode;

/// Errors raised while building resource mappings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A consumes/produces entry is not of the form `type/subtype`.
    #[error("Invalid argument. Not a valid MIME type format type/subtype: {0}")]
    InvalidMimeType(String),

    /// No resource is mapped to the given path template.
    #[error("No resource mapped to path template: {0:?}")]
    UnknownResource(String),
}

/// Failure raised by a `before`, `serve`, `catch` or `finally` callback.
///
/// Besides the message it carries the fields the default error handler uses
/// to build the error response: the HTTP status, an error name, an
/// application error code and whether the stack should be kept out of the
/// logs. Values set on the [`RequestContext`](crate::rest::RequestContext)
/// take precedence over the ones carried here.
#[derive(Debug, Error)]
#[error("{name}: {message}")]
pub struct HandlerError {
    status: Option<StatusCode>,
    name: String,
    code: Option<String>,
    message: String,
    suppress_stack: bool,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    /// Creates an error with the given name and message and no status.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: None,
            name: name.into(),
            code: None,
            message: message.into(),
            suppress_stack: false,
            source: None,
        }
    }

    /// Creates a plain `Error` with the given message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// Creates an error with an explicit status, named after its reason phrase.
    ///
    /// The stack is suppressed: these are expected, caller-signalled failures.
    pub fn with_status_code(status: StatusCode, message: impl Into<String>) -> Self {
        Self::new(status.reason_phrase(), message)
            .with_status(status)
            .suppress_stack()
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status_code(StatusCode::BadRequest, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status_code(StatusCode::NotFound, message)
    }

    /// Wraps any error, naming the failure after the error's type.
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<E>();
        let type_name = type_name.split('<').next().unwrap_or(type_name);
        let name = type_name.rsplit("::").next().unwrap_or(type_name);
        let mut handler_error = Self::new(name, error.to_string());
        handler_error.source = Some(Box::new(error));
        handler_error
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the error as expected so it is logged without its source chain.
    pub fn suppress_stack(mut self) -> Self {
        self.suppress_stack = true;
        self
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn details(&self) -> &str {
        &self.message
    }

    pub fn is_stack_suppressed(&self) -> bool {
        self.suppress_stack
    }

    /// Formats the error together with its chain of sources.
    pub fn chain(&self) -> Chain<'_> {
        Chain(self)
    }
}

/// Display adapter printing an error followed by its causes.
pub struct Chain<'a>(&'a HandlerError);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}

/// Request bodies that fail to parse are the client's fault.
impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        Self::from_error(error).with_status(StatusCode::BadRequest)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(error)
    }
}

impl From<std::str::Utf8Error> for HandlerError {
    fn from(error: std::str::Utf8Error) -> Self {
        Self::from_error(error).with_status(StatusCode::BadRequest)
    }
}

impl From<crate::parser::Error> for HandlerError {
    fn from(error: crate::parser::Error) -> Self {
        Self::from_error(error).with_status(StatusCode::BadRequest)
    }
}

impl From<MappingError> for HandlerError {
    fn from(error: MappingError) -> Self {
        Self::from_error(error)
    }
}

/// Errors escaping [`HttpController::execute`](crate::rest::HttpController::execute).
///
/// Routing, negotiation and handler failures are answered in-band with an
/// error response. Only a failing custom `catch` callback propagates.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Error handler for {method} {path} failed: {source}")]
    CatchHandler {
        method: String,
        path: String,
        #[source]
        source: HandlerError,
    },
}
