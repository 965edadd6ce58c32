//! HTTP Server
//!
//! Axum server exposing the scrape endpoint. There is no background refresh:
//! every request to the metrics endpoint drives a fresh probe of all
//! configured pools through the registered [`ZpoolCollector`], so a scrape
//! always reflects the latest synchronous inspection.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page linking to the metrics endpoint
//! - `GET /<endpoint>` - Prometheus metrics in text format (path configurable,
//!   default `/metrics`)
//! - `GET /health` - process liveness check, always 200
//!
//! Gathering runs on the blocking thread pool because the collector spawns
//! `zpool` child processes. The collector's internal mutex serializes
//! concurrent scrapes; a hung probe is bounded by the configured probe
//! timeout rather than stalling every later scrape indefinitely.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::time::Duration;
use tracing::{error, info};

use crate::collector::ZpoolCollector;
use crate::config::Config;

#[derive(Clone)]
struct AppState {
    registry: Registry,
    endpoint: String,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        !config.server.endpoint.is_empty() && !config.server.endpoint.contains('/'),
        "metrics endpoint must be a single path segment, got '{}'",
        config.server.endpoint
    );

    let pools = config.pool_names()?;
    let collector = ZpoolCollector::new(
        pools,
        Duration::from_secs(config.probe.timeout_seconds),
    )?;

    let registry = Registry::new();
    registry.register(Box::new(collector))?;

    let state = AppState {
        registry,
        endpoint: config.server.endpoint.clone(),
    };

    let metrics_path = format!("/{}", config.server.endpoint);
    let app = Router::new()
        .route("/", get(root_handler))
        .route(&metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = format!("{}:{}", config.server.addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}{}", addr, metrics_path);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Render all registered metrics in Prometheus text format.
///
/// Gathering triggers the collector, which probes every pool.
pub fn render(registry: &Registry) -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>Zpool Exporter</title></head>
<body>
<h1>Zpool Prometheus Exporter</h1>
<p><a href="/{}">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        state.endpoint
    ))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();
    let rendered = tokio::task::spawn_blocking(move || render(&registry)).await;

    match rendered {
        Ok(Ok(metrics)) => metrics.into_response(),
        Ok(Err(e)) => {
            error!("Failed to render metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
        Err(e) => {
            error!("Metrics collection task failed: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Metrics collection task failed".to_string(),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}
