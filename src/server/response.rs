//! HTTP response types and utilities.

use std::borrow::Cow;
use std::fmt;

use log::warn;
use serde::Serialize;

use crate::rest::Response;
use crate::server::error::Error;

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    Conflict = 409,
    Gone = 410,
    PayloadTooLarge = 413,
    UnsupportedMediaType = 415,
    UnprocessableEntity = 422,
    TooManyRequests = 429,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    const ALL: [StatusCode; 23] = [
        StatusCode::Ok,
        StatusCode::Created,
        StatusCode::Accepted,
        StatusCode::NoContent,
        StatusCode::MovedPermanently,
        StatusCode::Found,
        StatusCode::NotModified,
        StatusCode::BadRequest,
        StatusCode::Unauthorized,
        StatusCode::Forbidden,
        StatusCode::NotFound,
        StatusCode::MethodNotAllowed,
        StatusCode::NotAcceptable,
        StatusCode::Conflict,
        StatusCode::Gone,
        StatusCode::PayloadTooLarge,
        StatusCode::UnsupportedMediaType,
        StatusCode::UnprocessableEntity,
        StatusCode::TooManyRequests,
        StatusCode::InternalServerError,
        StatusCode::NotImplemented,
        StatusCode::BadGateway,
        StatusCode::ServiceUnavailable,
    ];

    /// The numeric status code.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Looks up a status by its numeric code.
    pub fn from_u16(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_u16() == code)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(&self) -> bool {
        self.as_u16() >= 500
    }

    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::Conflict => "Conflict",
            StatusCode::Gone => "Gone",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::UnprocessableEntity => "Unprocessable Entity",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// A buffered HTTP response.
///
/// Besides the builder methods used by the server itself, it implements
/// [`Response`] so handlers can write to it during a dispatch. Once
/// committed, status and headers no longer change; once closed, the body
/// no longer grows.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers, in insertion order
    pub headers: Vec<(String, String)>,
    /// The response body
    pub body: Vec<u8>,
    committed: bool,
    closed: bool,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![("Server".to_string(), "microrest-rs".to_string())],
            body: Vec::new(),
            committed: false,
            closed: false,
        }
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        self.with_body_bytes(body.into().into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.replace_header(name.into(), value.into());
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Set the response body with a JSON value.
    ///
    /// This method serializes the provided value to JSON and sets it as the response body.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value).map_err(Error::JsonError)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body_bytes(json))
    }

    /// The first value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values of a header, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The body parsed as JSON.
    pub fn body_json(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_slice(&self.body).map_err(Error::JsonError)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn replace_header(&mut self, name: String, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));
    }

    /// Convert the response to bytes.
    ///
    /// `Content-Length` is always derived from the body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        // Add the status line
        let status_line = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.status.reason_phrase());
        bytes.extend_from_slice(status_line.as_bytes());

        // Add the headers
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            let header_line = format!("{name}: {value}\r\n");
            bytes.extend_from_slice(header_line.as_bytes());
        }
        bytes.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());

        // Add the empty line that separates headers from body
        bytes.extend_from_slice(b"\r\n");

        // Add the body
        bytes.extend_from_slice(&self.body);

        bytes
    }
}

impl Response for HttpResponse {
    fn set_status(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = status;
        }
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if !self.committed {
            self.replace_header(name.to_string(), value.to_string());
        }
    }

    fn add_header(&mut self, name: &str, value: &str) {
        if !self.committed {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }

    fn print(&mut self, text: &str) {
        if !self.closed {
            self.body.extend_from_slice(text.as_bytes());
        }
    }

    fn is_committed(&self) -> bool {
        self.committed
    }

    fn flush(&mut self) {
        self.committed = true;
    }

    fn close(&mut self) {
        self.committed = true;
        self.closed = true;
    }

    fn send_error(&mut self, status: StatusCode, message: &str) {
        if self.committed {
            warn!("Cannot send error {status} after the response has been committed");
            return;
        }
        self.status = status;
        self.replace_header("Content-Type".to_string(), "text/plain".to_string());
        self.body = message.as_bytes().to_vec();
        self.committed = true;
    }
}
