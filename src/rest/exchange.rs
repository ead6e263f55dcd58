//! The request/response collaborators a dispatch works against.

use std::collections::HashMap;

use serde::Serialize;

use crate::rest::context::RequestContext;
use crate::rest::controller::HttpController;
use crate::rest::error::HandlerError;
use crate::rest::method::HandlerConfiguration;
use crate::server::StatusCode;

/// Read access to an inbound request.
pub trait Request {
    /// The request method, e.g. `GET`.
    fn method(&self) -> &str;

    /// The path matched against the resource path templates.
    fn resource_path(&self) -> &str;

    /// A header value, looked up case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// The parsed query string.
    fn query_parameters(&self) -> &HashMap<String, String>;

    /// The raw request body.
    fn body(&self) -> &[u8];

    fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// The body as UTF-8 text.
    fn text(&self) -> Result<&str, HandlerError> {
        Ok(std::str::from_utf8(self.body())?)
    }

    /// The body parsed as a JSON document.
    fn json_value(&self) -> Result<serde_json::Value, HandlerError> {
        Ok(serde_json::from_slice(self.body())?)
    }
}

/// Write access to the outbound response.
///
/// A response is *committed* once its status and headers can no longer
/// change: after `flush`, `close` or `send_error`.
pub trait Response {
    fn set_status(&mut self, status: StatusCode);

    fn status(&self) -> StatusCode;

    /// Sets a header, replacing any previous values.
    fn set_header(&mut self, name: &str, value: &str);

    /// Adds a header value, keeping previous ones.
    fn add_header(&mut self, name: &str, value: &str);

    /// Appends text to the body.
    fn print(&mut self, text: &str);

    fn is_committed(&self) -> bool;

    fn flush(&mut self);

    fn close(&mut self);

    /// Answers with an error status and a plain message, committing the response.
    fn send_error(&mut self, status: StatusCode, message: &str);

    fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }
}

/// Everything a lifecycle callback gets to work with.
pub struct Exchange<'a> {
    pub context: &'a mut RequestContext,
    pub request: &'a dyn Request,
    pub response: &'a mut dyn Response,
    /// The handler configuration selected for this request.
    pub configuration: &'a HandlerConfiguration,
    pub controller: &'a HttpController,
}

impl Exchange<'_> {
    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.context.path_parameter(name)
    }

    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.context.query_parameter(name)
    }

    /// Writes `value` as a JSON body with the given status.
    ///
    /// A value that cannot be serialized fails without a status, so it is
    /// answered as a server error.
    pub fn send_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), HandlerError> {
        let body = serde_json::to_string(value).map_err(HandlerError::from_error)?;
        self.response.set_status(status);
        self.response.set_content_type("application/json");
        self.response.print(&body);
        Ok(())
    }

    /// Writes a plain text body with the given status.
    pub fn send_text(&mut self, status: StatusCode, text: &str) {
        self.response.set_status(status);
        self.response.set_content_type("text/plain");
        self.response.print(text);
    }

    /// Answers `error` the way the controller does when no `catch` is configured.
    pub fn respond_with_error(&mut self, error: &HandlerError) {
        self.controller
            .handle_error(&*self.context, self.request, &mut *self.response, error);
    }

    /// Answers with the uniform error body.
    pub fn send_error(&mut self, status: StatusCode, code: Option<&str>, name: &str, details: Option<&str>) {
        self.controller
            .send_error(self.request, &mut *self.response, status, code, name, details);
    }
}
