//! HTTP request parsing and representation.

use std::collections::HashMap;
use std::str::FromStr;
use serde::de::DeserializeOwned;

use crate::parser::error::Error;
use crate::parser::method::Method;
use crate::parser::version::HttpVersion;
use crate::rest::Request;

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path, without the query string
    pub path: String,
    /// The path the resource mappings are matched against.
    ///
    /// Equal to `path` unless the request was mounted under a context path.
    pub resource_path: String,
    /// The HTTP version
    pub version: HttpVersion,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The request body
    pub body: Vec<u8>,
    /// Query parameters parsed from the request target
    pub query_params: HashMap<String, String>,
}

/// Splits a query string into its key/value pairs. Later keys win.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

impl HttpRequest {
    /// Create a new HTTP request with an empty body.
    ///
    /// The `target` is the request target from the request line; a query
    /// string, if any, is split off into [`HttpRequest::query_params`].
    pub fn new(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>) -> Self {
        let target = target.into();
        let (path, query_params) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query(query)),
            None => (target, HashMap::new()),
        };

        Self {
            method,
            resource_path: path.clone(),
            path,
            version,
            headers,
            body: Vec::new(),
            query_params,
        }
    }

    /// Create a new HTTP request with a body.
    pub fn with_body(method: Method, target: impl Into<String>, version: HttpVersion, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let mut request = Self::new(method, target, version, headers);
        request.body = body;
        request
    }

    /// Replaces the path used for resource matching.
    pub fn with_resource_path(mut self, resource_path: impl Into<String>) -> Self {
        self.resource_path = resource_path.into();
        self
    }

    /// Get a header value.
    ///
    /// Header names are matched case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&String> {
        self.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v)
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Parse the request body as JSON.
    ///
    /// Fails with [`Error::MissingHeader`] unless the request declares a JSON
    /// content type.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.body)?;
        Ok(json)
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .is_some_and(|content_type| content_type.starts_with("application/json"))
    }

    /// Get a query parameter value.
    pub fn get_query_param(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Check if a query parameter exists.
    pub fn has_query_param(&self, name: &str) -> bool {
        self.query_params.contains_key(name)
    }
}

impl Request for HttpRequest {
    fn method(&self) -> &str {
        self.method.as_str()
    }

    fn resource_path(&self) -> &str {
        &self.resource_path
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.get_header(name).map(String::as_str)
    }

    fn query_parameters(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Parse an HTTP request from a byte slice.
///
/// The head (request line and headers) must be UTF-8. Everything after the
/// blank line is the body, truncated to `Content-Length` when the header is
/// present.
pub fn parse_request(input: &[u8]) -> Result<HttpRequest, Error> {
    if input.is_empty() {
        return Err(Error::EmptyRequest);
    }

    let (head, body) = match input.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(end) => (&input[..end], &input[end + 4..]),
        None => (input, &input[input.len()..]),
    };

    let head = std::str::from_utf8(head)
        .map_err(|_| Error::MalformedRequestLine("Invalid UTF-8".to_string()))?;

    let mut lines = head.lines();

    let request_line = lines.next().ok_or(Error::EmptyRequest)?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(Error::MalformedRequestLine(request_line.to_string()));
    }

    let method = Method::from_str(parts[0])?;

    let target = parts[1];
    if !target.starts_with('/') {
        return Err(Error::InvalidPath(target.to_string()));
    }

    let version = HttpVersion::from_str(parts[2])?;

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeaderFormat(line.to_string()))?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    if version.requires_host() && !headers.keys().any(|k| k.eq_ignore_ascii_case("Host")) {
        return Err(Error::MissingHeader("Host".to_string()));
    }

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let body = match content_length {
        Some(len) if len < body.len() => &body[..len],
        _ => body,
    };

    Ok(HttpRequest::with_body(method, target, version, headers, body.to_vec()))
}
