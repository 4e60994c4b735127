//! HTTP/1.1 transport for an [`App`].
//!
//! Each accepted connection is served by hyper on its own task. Request
//! bodies are collected (up to `max_body_bytes`) and handed to
//! [`App::handle`]; the optional request timeout covers collection and
//! dispatch together.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use keystone::core::{ErrorEnvelope, Response};
use keystone::App;
use keystone_config::{KeystoneConfig, ServerConfig};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Serves an [`App`] over TCP.
///
/// # Example
///
/// ```rust,no_run
/// use keystone::prelude::*;
/// use keystone_config::ConfigLoader;
/// use keystone_server::Server;
///
/// # async fn run() -> anyhow::Result<()> {
/// let config = ConfigLoader::new().with_env_prefix("KEYSTONE").load()?;
/// let routes = RouteCollection::new()
///     .route(Route::get("/ping").handle(|_ctx: RequestContext| async {
///         Ok::<_, DomainError>("pong")
///     }))?;
///
/// Server::from_config(App::new(&routes)?, &config).run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    app: App,
    config: ServerConfig,
}

impl Server {
    /// Creates a server for `app`.
    #[must_use]
    pub fn new(app: App, config: ServerConfig) -> Self {
        Self { app, config }
    }

    /// Creates a server from a full configuration, applying the configured
    /// internal error message to `app`.
    #[must_use]
    pub fn from_config(app: App, config: &KeystoneConfig) -> Self {
        let app = app.with_internal_error_message(config.errors.internal_message.clone());
        Self::new(app, config.server.clone())
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .addr
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.config.addr.clone()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.run_with_listener(listener, shutdown).await
    }

    /// Accepts connections on `listener` until `shutdown` fires, then waits
    /// up to the shutdown timeout for open connections to finish.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.serve_connection(stream, shutdown).await {
                                tracing::debug!(%remote, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = &mut stop => {
                    tracing::info!("shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let grace = server.config.shutdown_timeout();
        tracing::info!(
            connections = tracker.active_connections(),
            "waiting up to {grace:?} for open connections"
        );
        if tokio::time::timeout(grace, tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                connections = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>) -> Response {
        let (parts, body) = req.into_parts();
        let span = tracing::debug_span!("connection_request", method = %parts.method);

        let work = async {
            let body = match collect_body(body, self.config.max_body_bytes).await {
                Ok(body) => body,
                Err(response) => return response,
            };
            self.app.handle(Request::from_parts(parts, body)).await
        };

        match self.config.request_timeout() {
            Some(limit) => match tokio::time::timeout(limit, work).instrument(span).await {
                Ok(response) => response,
                Err(_) => gateway_timeout(limit),
            },
            None => work.instrument(span).await,
        }
    }
}

async fn collect_body(body: Incoming, limit: usize) -> Result<Bytes, Response> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => {
            tracing::warn!(limit, "request body too large");
            Err(ErrorEnvelope::from_status(StatusCode::PAYLOAD_TOO_LARGE)
                .with_message(format!("Request body exceeds {limit} bytes"))
                .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to read request body");
            Err(ErrorEnvelope::from_status(StatusCode::BAD_REQUEST)
                .with_message("Failed to read request body")
                .into_response())
        }
    }
}

fn gateway_timeout(limit: Duration) -> Response {
    tracing::warn!(?limit, "request timed out");
    ErrorEnvelope::from_status(StatusCode::GATEWAY_TIMEOUT)
        .with_message("Request timed out")
        .into_response()
}
