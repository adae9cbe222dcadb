//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, security headers)
//! - Bind server to listener
//! - Stop accepting and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::collector::Collector;
use crate::config::ExporterConfig;
use crate::http::handlers::{health_handler, index_handler, metrics_handler, AppState};
use crate::lifecycle::Shutdown;
use crate::observability::MetricsExporter;

/// Slack added to the collection deadline before a request is timed out.
const REQUEST_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// HTTP server for the exporter.
pub struct HttpServer {
    router: Router,
    collector: Arc<ArcSwap<Collector>>,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &ExporterConfig, collector: Collector, version: impl Into<String>, shutdown: Shutdown) -> Self {
        let collector = Arc::new(ArcSwap::from_pointee(collector));
        let state = AppState {
            collector: collector.clone(),
            exporter: Arc::new(MetricsExporter::new()),
            metrics_path: config.server.path.clone(),
            version: version.into(),
            shutdown: shutdown.clone(),
        };

        let request_timeout = config.collection.timeout() + REQUEST_TIMEOUT_SLACK;
        let router = Self::build_router(&config.server.path, request_timeout, state);
        Self {
            router,
            collector,
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(metrics_path: &str, request_timeout: Duration, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(health_handler))
            .route("/", get(index_handler));
        if !matches!(metrics_path, "/" | "/health" | "/healthz") {
            router = router.route(metrics_path, get(metrics_handler));
        } else {
            tracing::warn!(path = %metrics_path, "Metrics path collides with a built-in route, metrics not served");
        }

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("1; mode=block"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
    }

    /// Shared handle used to swap the collector on reload.
    pub fn collector(&self) -> Arc<ArcSwap<Collector>> {
        self.collector.clone()
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
