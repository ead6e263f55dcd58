//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::signal;
use log::{info, warn, error};

use crate::parser::parse_request;
use crate::rest::HttpController;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// Strips `context_path` from the front of `path`.
///
/// Returns `None` when `path` does not lie under `context_path`. The prefix
/// must end at a segment boundary: `/api` covers `/api` and `/api/users` but
/// not `/apix`.
pub fn strip_context_path<'a>(path: &'a str, context_path: &str) -> Option<&'a str> {
    let prefix = context_path.trim_end_matches('/');
    if prefix.is_empty() {
        return Some(path);
    }

    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// An HTTP server dispatching every request through one [`HttpController`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    /// The controller shared by all connections.
    pub controller: Arc<HttpController>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and controller.
    pub fn new(config: ServerConfig, controller: HttpController) -> Self {
        Self {
            config,
            controller: Arc::new(controller),
        }
    }

    /// Log the mounted resources.
    fn display_server_info(&self) {
        let mappings = self.controller.mappings();
        let mut resources: Vec<_> = mappings.resources().collect();
        resources.sort_by(|a, b| a.path().cmp(b.path()));

        info!("Registered resources under {:?}:", self.config.context_path);
        for resource in resources {
            let verbs = resource
                .verbs()
                .map(str::to_uppercase)
                .collect::<Vec<String>>()
                .join(", ");
            info!("  [{verbs}] {:?}", resource.path());
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = self.config.addr);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: Arc<mpsc::Sender<()>>, tasks: &mut JoinSet<()>) {
        tasks.spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        });
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        &self,
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: Arc<tokio::sync::Semaphore>,
        shutdown_tx: Arc<mpsc::Sender<()>>,
        tasks: &mut JoinSet<()>,
    ) {
        // Try to acquire a permit from the semaphore
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                // Send a 503 Service Unavailable response
                let response = HttpResponse::new(StatusCode::ServiceUnavailable)
                    .with_content_type("text/plain")
                    .with_body_string("Server is at capacity, please try again later");
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        // Clone references for the task
        let controller = Arc::clone(&self.controller);
        let read_buffer_size = self.config.read_buffer_size;
        let context_path = self.config.context_path.clone();

        // Spawn a task to handle the connection
        tasks.spawn(async move {
            // The permit is dropped when the task completes, releasing the semaphore slot
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, controller, read_buffer_size, &context_path).await {
                error!("Error handling connection from {addr}: {e}");

                // If there's a critical error, signal shutdown
                if matches!(e, Error::IoError(_)) {
                    info!("Critical I/O error, initiating shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
            }
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        // If there's a critical error, signal to break the loop
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        // For other errors, wait a bit before retrying
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    async fn perform_shutdown(tasks: &mut JoinSet<()>) {
        // Wait for all tasks to complete (with timeout)
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let _ = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        }).await;

        info!("Server shutdown complete");
    }

    /// Start the server and listen for incoming connections.
    pub async fn start(&self) -> Result<(), Error> {
        // Log the mounted resources
        self.display_server_info();

        // Set up the TCP listener
        let listener = self.setup_listener().await?;

        // Create a semaphore to limit concurrent connections
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_connections));

        // Create a channel for shutdown signaling
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let shutdown_tx = Arc::new(shutdown_tx);

        // Use JoinSet to keep track of all spawned tasks
        let mut tasks = JoinSet::new();

        // Set up a Ctrl+C handler for graceful shutdown
        Self::setup_ctrl_c_handler(shutdown_tx.clone(), &mut tasks);

        loop {
            tokio::select! {
                // Check for shutdown signal
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                // Accept new connections
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            self.handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                shutdown_tx.clone(),
                                &mut tasks
                            ).await;
                        },
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        // Perform graceful shutdown
        Self::perform_shutdown(&mut tasks).await;

        Ok(())
    }

    /// Handle a single connection.
    ///
    /// Reads and parses one request, mounts it under `context_path` and runs
    /// it through `controller` on the blocking thread pool. The response is
    /// written even when the dispatch reports an error.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        controller: Arc<HttpController>,
        read_buffer_size: usize,
        context_path: &str,
    ) -> Result<(), Error> {
        let mut buf = vec![0; read_buffer_size];

        // Read data from the socket
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(()); // Connection closed
        }

        // Parse the HTTP request
        let request = match parse_request(&buf[..n]) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::new(StatusCode::BadRequest)
                    .with_content_type("text/plain")
                    .with_body_string(format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::ParseError(e));
            }
        };

        // Mount the request under the context path
        let resource_path = strip_context_path(&request.path, context_path).map(str::to_string);
        let Some(resource_path) = resource_path else {
            let response = HttpResponse::new(StatusCode::NotFound)
                .with_content_type("text/plain")
                .with_body_string(format!("Not found: {path}", path = request.path));
            socket.write_all(&response.to_bytes()).await?;
            return Err(Error::NotFound(request.path));
        };
        let request = request.with_resource_path(resource_path);

        // Dispatch through the controller
        let (response, outcome) = tokio::task::spawn_blocking(move || {
            let mut response = HttpResponse::default();
            let outcome = controller.execute(&request, &mut response);
            (response, outcome)
        })
        .await?;

        // Send the response
        socket.write_all(&response.to_bytes()).await?;
        outcome?;

        Ok(())
    }
}
