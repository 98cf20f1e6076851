//! HTTP surface for the room coordinator.
//!
//! One router serves everything:
//! - `/ws` - the realtime channel (WebSocket upgrade)
//! - `/api/media-credential` - short-lived media credentials
//! - `/health`, `/ready` - Kubernetes probes
//! - `/metrics` - Prometheus scrape endpoint

pub mod credentials;
pub mod ws;

pub use credentials::issue_credential;
pub use ws::websocket_handler;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::actors::CoordinatorHandle;
use crate::config::Config;
use crate::observability::{health_router, HealthState};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the coordinator actor.
    pub coordinator: CoordinatorHandle,

    /// Service configuration.
    pub config: Arc<Config>,

    /// Liveness and readiness state.
    pub health: Arc<HealthState>,
}

/// Build the application routes.
///
/// The request timeout covers only the plain HTTP endpoints; a WebSocket
/// upgrade completes its response immediately and the upgraded stream lives
/// on outside the middleware.
pub fn build_routes(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/api/media-credential", post(issue_credential))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    health_router(Arc::clone(&state.health))
        .merge(api_routes)
        .merge(ws_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}

/// Handler for GET /metrics.
///
/// Returns Prometheus-formatted metrics for scraping. Unauthenticated; the
/// labels carry only bounded operational data.
#[tracing::instrument(skip_all, name = "rc.metrics.scrape")]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
