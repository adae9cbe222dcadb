//! Request handlers.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::collector::Collector;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::{MetricsExporter, CONTENT_TYPE};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<ArcSwap<Collector>>,
    pub exporter: Arc<MetricsExporter>,
    pub metrics_path: String,
    pub version: String,
    pub shutdown: Shutdown,
}

/// Run one collection cycle and render it.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let collector = state.collector.load_full();
    let snapshot = collector.collect(&state.shutdown.token()).await;
    let body = state.exporter.render(&snapshot, &collector.stats());

    tracing::debug!(
        targets = snapshot.len(),
        healthy = snapshot.healthy,
        bytes = body.len(),
        "Served metrics"
    );

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

/// Liveness: healthy while the inspection command can be found.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    if state.collector.load().is_command_available() {
        (StatusCode::OK, Json(json!({ "status": "healthy" }))).into_response()
    } else {
        tracing::warn!("Health check failed: findmnt command not available");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": "findmnt command not available" })),
        )
            .into_response()
    }
}

pub async fn index_handler(State(state): State<AppState>) -> Response {
    let body = format!(
        "Mount Exporter\n\nMetrics: {}\nHealth: /health\nVersion: {}\n",
        state.metrics_path, state.version
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}
