//! Request dispatch over a frozen set of resource mappings.

use std::fmt;
use std::sync::Arc;

use log::{error, info, trace};
use serde::Serialize;

use crate::mime;
use crate::rest::context::RequestContext;
use crate::rest::error::{DispatchError, HandlerError};
use crate::rest::exchange::{Exchange, Request, Response};
use crate::rest::mappings::ResourceMappings;
use crate::rest::method::HandlerConfiguration;
use crate::rest::router::Router;
use crate::server::StatusCode;

/// Default log target of [`HttpController`].
pub const DEFAULT_LOG_TARGET: &str = "microrest::controller";

/// The stages a dispatch goes through, in order.
///
/// `Catch` is only entered when `before` or `serve` fails. A request that
/// cannot be routed or negotiated ends right after `Routing` or
/// `MimeMatching` without reaching `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Routing,
    MimeMatching,
    Before,
    Serve,
    Catch,
    Finally,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Routing => "ROUTING",
            Phase::MimeMatching => "MIME_MATCHING",
            Phase::Before => "BEFORE",
            Phase::Serve => "SERVE",
            Phase::Catch => "CATCH",
            Phase::Finally => "FINALLY",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Callback notified on every phase transition.
pub type PhaseObserver = Arc<dyn Fn(Phase) + Send + Sync>;

/// Body of the uniform JSON error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: Option<&'a str>,
    error: &'a str,
    details: Option<&'a str>,
}

/// Routes requests to the handler configurations of a [`ResourceMappings`]
/// and drives them through `before`, `serve`, `catch` and `finally`.
///
/// The controller owns its mappings, so they cannot change while requests
/// are being served; a controller can be shared between threads.
pub struct HttpController {
    mappings: ResourceMappings,
    router: Router,
    log_target: String,
    observer: Option<PhaseObserver>,
}

impl HttpController {
    pub fn new(mappings: ResourceMappings) -> Self {
        let router = Router::new(mappings.paths());
        Self {
            mappings,
            router,
            log_target: DEFAULT_LOG_TARGET.to_string(),
            observer: None,
        }
    }

    /// Logs under `target` instead of [`DEFAULT_LOG_TARGET`].
    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    /// Reports every phase transition to `observer`.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(Phase) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn mappings(&self) -> &ResourceMappings {
        &self.mappings
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    fn enter(&self, phase: Phase) {
        trace!(target: self.log_target.as_str(), "Entering {phase}");
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    /// Dispatches one request.
    ///
    /// Requests without a matching route or handler are answered with
    /// `400 Bad Request`; handler failures are answered with an error
    /// response. The only error returned is a failing custom `catch`
    /// callback, and only after the response was closed and `finally` ran.
    pub fn execute(&self, request: &dyn Request, response: &mut dyn Response) -> Result<(), DispatchError> {
        let request_path = request.resource_path();
        let verb = request.method().to_lowercase();
        let accept = request.header("Accept");
        let content_type = request.content_type();

        self.enter(Phase::Routing);
        let route = self.router.best_match(request_path, |template| {
            self.mappings
                .get(template)
                .is_some_and(|resource| resource.handles(&verb))
        });
        let Some(route) = route else {
            self.reject_unmatched(request, response, &verb, "no route");
            return Ok(());
        };
        trace!(
            target: self.log_target.as_str(),
            "Resource[{request_path}] matched path template {:?}",
            route.defined_path
        );

        self.enter(Phase::MimeMatching);
        let configuration = self
            .mappings
            .get(&route.defined_path)
            .map(|resource| resource.handlers(&verb))
            .unwrap_or_default()
            .iter()
            .filter(|configuration| configuration.is_dispatchable())
            .find(|configuration| {
                mime::match_media_type(
                    accept,
                    content_type,
                    configuration.produces.as_deref(),
                    configuration.consumes.as_deref(),
                )
            });
        let Some(configuration) = configuration else {
            self.reject_unmatched(request, response, &verb, "no media type match");
            return Ok(());
        };

        let mut context = RequestContext::new(route.path_parameters, request.query_parameters().clone());
        let mut exchange = Exchange {
            context: &mut context,
            request,
            response,
            configuration,
            controller: self,
        };

        let caught = self.serve_and_catch(&mut exchange, configuration);

        self.enter(Phase::Finally);
        Self::close_response(&mut *exchange.response);
        if let Some(finally) = &configuration.finally {
            if let Err(e) = finally(&mut exchange) {
                error!(
                    target: self.log_target.as_str(),
                    "Serving Resource[{request_path}], Method[{}] post handler failed: {}",
                    verb.to_uppercase(),
                    e.chain()
                );
            }
        }

        self.enter(Phase::Done);
        caught.map_err(|source| DispatchError::CatchHandler {
            method: verb.to_uppercase(),
            path: request_path.to_string(),
            source,
        })
    }

    /// Runs `before` and `serve`, routing a failure to `catch`.
    ///
    /// Returns the error of a failing custom `catch` callback.
    fn serve_and_catch(
        &self,
        exchange: &mut Exchange<'_>,
        configuration: &HandlerConfiguration,
    ) -> Result<(), HandlerError> {
        let Err(failure) = self.before_and_serve(exchange, configuration) else {
            return Ok(());
        };

        self.enter(Phase::Catch);
        match &configuration.catch {
            Some(catch) => catch(exchange, failure).map_err(|e| {
                error!(
                    target: self.log_target.as_str(),
                    "Serving Resource[{}], Method[{}] error handler failed: {}",
                    exchange.request.resource_path(),
                    exchange.request.method(),
                    e.chain()
                );
                e
            }),
            None => {
                exchange.respond_with_error(&failure);
                Ok(())
            }
        }
    }

    fn before_and_serve(
        &self,
        exchange: &mut Exchange<'_>,
        configuration: &HandlerConfiguration,
    ) -> Result<(), HandlerError> {
        self.enter(Phase::Before);
        if let Some(before) = &configuration.before {
            before(exchange)?;
        }

        if exchange.response.is_committed() {
            trace!(target: self.log_target.as_str(), "Response committed before serving, skipping serve");
            return Ok(());
        }

        self.enter(Phase::Serve);
        match &configuration.serve {
            Some(serve) => serve(exchange),
            None => Ok(()),
        }
    }

    fn reject_unmatched(&self, request: &dyn Request, response: &mut dyn Response, verb: &str, reason: &str) {
        error!(
            target: self.log_target.as_str(),
            "No suitable resource handler for Resource[{}], Method[{}], Content-Type[{}], Accept[{}] found ({reason})",
            request.resource_path(),
            verb.to_uppercase(),
            request.content_type().unwrap_or_default(),
            request.header("Accept").unwrap_or_default()
        );
        self.send_error(
            request,
            response,
            StatusCode::BadRequest,
            None,
            "Bad Request",
            Some("No suitable processor for this request."),
        );
    }

    /// The default `catch` behaviour.
    ///
    /// Status, name, code and message recorded on `context` win over the ones
    /// carried by `error`; the status falls back to `500`. Errors with a
    /// suppressed stack are logged at info level, all others at error level
    /// together with their causes.
    pub fn handle_error(
        &self,
        context: &RequestContext,
        request: &dyn Request,
        response: &mut dyn Response,
        error: &HandlerError,
    ) {
        let status = context
            .http_error_code
            .or(error.status())
            .unwrap_or(StatusCode::InternalServerError);
        let name = context.error_name.as_deref().unwrap_or(error.name());
        let code = context.error_code.as_deref().or(error.code());
        let details = context.error_message.as_deref().unwrap_or(error.details());

        if context.suppress_stack || error.is_stack_suppressed() {
            info!(
                target: self.log_target.as_str(),
                "Serving Resource[{}], Method[{}] finished in error. {name}{}: {details}",
                request.resource_path(),
                request.method(),
                code.map(|code| format!(" [{code}]")).unwrap_or_default()
            );
        } else {
            error!(
                target: self.log_target.as_str(),
                "Serving Resource[{}], Method[{}] finished in error: {}",
                request.resource_path(),
                request.method(),
                error.chain()
            );
        }

        self.send_error(request, response, status, code, name, Some(details));
    }

    /// Writes the uniform error response and closes `response`.
    ///
    /// Clients accepting HTML get `name[code]: details` through
    /// [`Response::send_error`]; everyone else, including clients sending no
    /// `Accept` header, gets a JSON body `{"code", "error", "details"}`.
    pub fn send_error(
        &self,
        request: &dyn Request,
        response: &mut dyn Response,
        status: StatusCode,
        code: Option<&str>,
        name: &str,
        details: Option<&str>,
    ) {
        let accepts = mime::normalize(request.header("Accept"))
            .unwrap_or_else(|| vec!["application/json".to_string()]);
        let is_html = accepts
            .iter()
            .any(|accept| mime::is_compatible("*/html", accept));

        response.set_status(status);
        if is_html {
            let mut message = name.to_string();
            if let Some(code) = code {
                message.push_str(&format!("[{code}]"));
            }
            if let Some(details) = details.filter(|details| !details.is_empty()) {
                message.push_str(&format!(": {details}"));
            }
            response.send_error(status, &message);
        } else {
            let body = ErrorBody {
                code,
                error: name,
                details,
            };
            response.set_content_type("application/json");
            match serde_json::to_string_pretty(&body) {
                Ok(json) => response.print(&json),
                Err(e) => error!(target: self.log_target.as_str(), "Failed to serialize error body: {e}"),
            }
        }

        Self::close_response(response);
    }

    fn close_response(response: &mut dyn Response) {
        response.flush();
        response.close();
    }
}

impl fmt::Debug for HttpController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpController")
            .field("mappings", &self.mappings)
            .field("router", &self.router)
            .field("log_target", &self.log_target)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
