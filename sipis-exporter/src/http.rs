//! HTTP server for the Prometheus metrics endpoint.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::collector::SharedCollector;

/// Content type of the OpenMetrics text format.
pub const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
}

/// Create the HTTP router.
pub fn create_router(collector: SharedCollector, metrics_path: &str) -> Router {
    let state = AppState { collector };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.collector.gauges().render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics\n").into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint. Ready once the first collection cycle
/// has finished, whatever its outcome.
async fn ready_handler(State(state): State<AppState>) -> Response {
    if state.collector.stats().cycles_completed > 0 {
        (StatusCode::OK, "ready\n").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready - no collection cycle completed yet\n",
        )
            .into_response()
    }
}

/// HTTP server for the exposition endpoint.
pub struct HttpServer {
    collector: SharedCollector,
    listener: TcpListener,
    metrics_path: String,
}

impl HttpServer {
    /// Bind the listen address, resolving host names. Failing to bind is
    /// fatal for the exporter, so this happens before any collection starts.
    pub async fn bind<A>(
        collector: SharedCollector,
        listen_addr: A,
        metrics_path: String,
    ) -> anyhow::Result<Self>
    where
        A: ToSocketAddrs + std::fmt::Display,
    {
        let display = listen_addr.to_string();
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", display, e))?;

        Ok(Self {
            collector,
            listener,
            metrics_path,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        let router = create_router(self.collector, &self.metrics_path);

        info!(
            addr = %addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
