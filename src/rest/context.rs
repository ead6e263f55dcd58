//! Per-request dispatch context.

use std::collections::HashMap;

use crate::rest::error::HandlerError;
use crate::server::StatusCode;

/// State shared by the callbacks of a single dispatch.
///
/// The error fields let a callback shape the default error response before
/// failing; they override the values carried by the returned
/// [`HandlerError`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path_parameters: HashMap<String, String>,
    pub query_parameters: HashMap<String, String>,
    pub http_error_code: Option<StatusCode>,
    pub error_name: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub suppress_stack: bool,
}

impl RequestContext {
    pub fn new(path_parameters: HashMap<String, String>, query_parameters: HashMap<String, String>) -> Self {
        Self {
            path_parameters,
            query_parameters,
            ..Self::default()
        }
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters.get(name).map(String::as_str)
    }

    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query_parameters.get(name).map(String::as_str)
    }

    /// Records a caller-signalled failure and returns the error to raise.
    ///
    /// ```
    /// use microrest_rs::rest::RequestContext;
    /// use microrest_rs::StatusCode;
    ///
    /// let mut ctx = RequestContext::default();
    /// let err = ctx.reject(StatusCode::Conflict, "Conflict", "already exists");
    /// assert_eq!(ctx.http_error_code, Some(StatusCode::Conflict));
    /// assert!(ctx.suppress_stack);
    /// assert_eq!(err.details(), "already exists");
    /// ```
    pub fn reject(&mut self, status: StatusCode, name: &str, message: &str) -> HandlerError {
        self.http_error_code = Some(status);
        self.error_name = Some(name.to_string());
        self.error_message = Some(message.to_string());
        self.suppress_stack = true;
        HandlerError::new(name, message)
            .with_status(status)
            .suppress_stack()
    }
}
