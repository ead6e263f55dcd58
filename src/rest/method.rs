//! Handler configurations and the `ResourceMethod` builder.

use std::fmt;
use std::sync::Arc;

use crate::mime;
use crate::rest::error::{HandlerError, MappingError};
use crate::rest::exchange::Exchange;

/// Result returned by every lifecycle callback.
pub type HandlerResult = Result<(), HandlerError>;

/// A `before`, `serve` or `finally` callback.
pub type Callback = Arc<dyn Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync>;

/// A `catch` callback. Receives the error raised by `before` or `serve`.
pub type CatchCallback = Arc<dyn Fn(&mut Exchange<'_>, HandlerError) -> HandlerResult + Send + Sync>;

/// Wraps a closure into a [`Callback`].
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure into a [`CatchCallback`].
pub fn catch_callback<F>(f: F) -> CatchCallback
where
    F: Fn(&mut Exchange<'_>, HandlerError) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A request handler expressed as one object instead of separate callbacks.
///
/// Only `serve` is required. The default `catch` answers with the
/// controller's uniform error response.
pub trait RouteHandler: Send + Sync {
    fn before(&self, _exchange: &mut Exchange<'_>) -> HandlerResult {
        Ok(())
    }

    fn serve(&self, exchange: &mut Exchange<'_>) -> HandlerResult;

    fn catch(&self, exchange: &mut Exchange<'_>, error: HandlerError) -> HandlerResult {
        exchange.respond_with_error(&error);
        Ok(())
    }

    fn finally(&self, _exchange: &mut Exchange<'_>) -> HandlerResult {
        Ok(())
    }
}

/// One handler entry of a resource verb: MIME constraints plus callbacks.
///
/// `None` constraints are unrestricted and are a different identity from an
/// empty list. Entries without `serve` are never selected for dispatch.
#[derive(Clone, Default)]
pub struct HandlerConfiguration {
    pub consumes: Option<Vec<String>>,
    pub produces: Option<Vec<String>>,
    pub before: Option<Callback>,
    pub serve: Option<Callback>,
    pub catch: Option<CatchCallback>,
    pub finally: Option<Callback>,
}

impl HandlerConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration with only a `serve` callback.
    pub fn serving<F>(serve: F) -> Self
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            serve: Some(callback(serve)),
            ..Self::default()
        }
    }

    /// Sets `consumes` as given, without validation or deduplication.
    pub fn with_consumes<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes = Some(mime_types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets `produces` as given, without validation or deduplication.
    pub fn with_produces<I, S>(mut self, mime_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.produces = Some(mime_types.into_iter().map(Into::into).collect());
        self
    }

    /// True if this entry's constraints equal the given ones element by element.
    ///
    /// Order matters: `["a/b", "c/d"]` and `["c/d", "a/b"]` are different.
    pub fn has_constraints(&self, consumes: Option<&[String]>, produces: Option<&[String]>) -> bool {
        self.consumes.as_deref() == consumes && self.produces.as_deref() == produces
    }

    pub fn is_dispatchable(&self) -> bool {
        self.serve.is_some()
    }

    /// Copies every property set on `other` over this one.
    pub(crate) fn merge(&mut self, other: HandlerConfiguration) {
        if other.consumes.is_some() {
            self.consumes = other.consumes;
        }
        if other.produces.is_some() {
            self.produces = other.produces;
        }
        if other.before.is_some() {
            self.before = other.before;
        }
        if other.serve.is_some() {
            self.serve = other.serve;
        }
        if other.catch.is_some() {
            self.catch = other.catch;
        }
        if other.finally.is_some() {
            self.finally = other.finally;
        }
    }
}

impl fmt::Debug for HandlerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfiguration")
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("before", &self.before.is_some())
            .field("serve", &self.serve.is_some())
            .field("catch", &self.catch.is_some())
            .field("finally", &self.finally.is_some())
            .finish()
    }
}

/// Appends validated MIME types to `setting`, skipping ones already present.
fn mime_setting<I, S>(setting: &mut Option<Vec<String>>, mime_types: I) -> Result<(), MappingError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mime_types: Vec<String> = mime_types.into_iter().map(Into::into).collect();
    if let Some(invalid) = mime_types.iter().find(|mime_type| !mime::is_valid(mime_type)) {
        return Err(MappingError::InvalidMimeType(invalid.clone()));
    }

    let existing = setting.get_or_insert_with(Vec::new);
    for mime_type in mime_types {
        if !existing.contains(&mime_type) {
            existing.push(mime_type);
        }
    }
    Ok(())
}

/// Fluent access to one registered [`HandlerConfiguration`].
///
/// ```
/// use microrest_rs::rest::ResourceMappings;
/// use microrest_rs::StatusCode;
///
/// let mut mappings = ResourceMappings::new();
/// mappings
///     .resource("{id}")
///     .get()
///     .produces(["application/json"])
///     .unwrap()
///     .serve(|exchange| {
///         let id = exchange.path_parameter("id").unwrap_or_default().to_string();
///         exchange.send_json(StatusCode::Ok, &serde_json::json!({ "id": id }))
///     });
/// ```
pub struct ResourceMethod<'a> {
    configuration: &'a mut HandlerConfiguration,
}

impl<'a> ResourceMethod<'a> {
    pub(crate) fn new(configuration: &'a mut HandlerConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &HandlerConfiguration {
        &*self.configuration
    }

    /// Adds MIME types this handler accepts as request content.
    ///
    /// Every entry must have the `type/subtype` shape; duplicates of entries
    /// already present are skipped.
    pub fn consumes<I, S>(self, mime_types: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        mime_setting(&mut self.configuration.consumes, mime_types)?;
        Ok(self)
    }

    /// Adds MIME types this handler can produce.
    pub fn produces<I, S>(self, mime_types: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        mime_setting(&mut self.configuration.produces, mime_types)?;
        Ok(self)
    }

    pub fn before<F>(self, f: F) -> Self
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.configuration.before = Some(callback(f));
        self
    }

    pub fn serve<F>(self, f: F) -> Self
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.configuration.serve = Some(callback(f));
        self
    }

    pub fn catch<F>(self, f: F) -> Self
    where
        F: Fn(&mut Exchange<'_>, HandlerError) -> HandlerResult + Send + Sync + 'static,
    {
        self.configuration.catch = Some(catch_callback(f));
        self
    }

    pub fn finally<F>(self, f: F) -> Self
    where
        F: Fn(&mut Exchange<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.configuration.finally = Some(callback(f));
        self
    }

    /// Installs all four callbacks from one [`RouteHandler`].
    pub fn handler<H>(self, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        let handler = Arc::new(handler);

        let h = Arc::clone(&handler);
        self.configuration.before = Some(callback(move |exchange| h.before(exchange)));
        let h = Arc::clone(&handler);
        self.configuration.serve = Some(callback(move |exchange| h.serve(exchange)));
        let h = Arc::clone(&handler);
        self.configuration.catch = Some(catch_callback(move |exchange, error| h.catch(exchange, error)));
        self.configuration.finally = Some(callback(move |exchange| handler.finally(exchange)));
        self
    }
}
