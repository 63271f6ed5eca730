//! Scrape endpoint for the scanner's counters.

use super::ScanMetrics;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::CorsLayer;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("metrics endpoint stopped: {0}")]
    Server(String),
}

/// Where the scrape endpoint listens. Port 0 in `[output] metrics_port`
/// disables it before this is ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
        }
    }
}

/// Serves `/metrics` and `/health` for one [`ScanMetrics`] handle.
///
/// The handle shares its registry with the controller, so a scrape taken
/// mid-attempt shows the live counters.
pub struct MetricsServer {
    config: MetricsServerConfig,
    metrics: ScanMetrics,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, metrics: ScanMetrics) -> Self {
        Self { config, metrics }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(scrape))
            .route("/health", get(|| async { (StatusCode::OK, "OK") }))
            .layer(CorsLayer::permissive())
            .with_state(self.metrics.clone())
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        tracing::info!(%addr, "Serving scanner metrics");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }
}

async fn scrape(State(metrics): State<ScanMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (StatusCode::OK, [("content-type", TEXT_FORMAT)], body),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}
