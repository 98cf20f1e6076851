//! Room Coordinator
//!
//! Stateful WebSocket signaling server for real-time meeting coordination.
//!
//! # Servers
//!
//! A single HTTP server (default: 0.0.0.0:8080) carries every surface:
//! - GET /ws - WebSocket upgrade for client sessions
//! - POST /api/media-credential - media-routing credential issuance
//! - GET /health, /ready - Kubernetes probes
//! - GET /metrics - Prometheus exposition
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Spawn the coordinator actor
//! 4. Bind the listener and mark the service ready
//! 5. Serve until a shutdown signal arrives
//!
//! # Shutdown Flow
//!
//! On SIGINT/SIGTERM the service flips readiness off, asks the coordinator
//! to end every meeting (members and waiting guests get a final event), and
//! lets the sessions drain as their outbound channels close.

use std::net::SocketAddr;
use std::sync::Arc;

use room_coordinator::actors::CoordinatorActor;
use room_coordinator::config::Config;
use room_coordinator::handlers::{build_routes, AppState};
use room_coordinator::observability::{init_metrics_recorder, HealthState};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_coordinator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Coordinator");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        listen_port = config.listen_port,
        credential_ttl_seconds = config.credential_ttl_seconds,
        media_configured = config.media.is_some(),
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    info!("Initializing Prometheus metrics recorder...");
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;
    info!("Prometheus metrics recorder initialized");

    // Initialize health state
    let health_state = Arc::new(HealthState::new());

    // Spawn the coordinator actor
    info!("Spawning coordinator actor...");
    let (coordinator, actor_task) = CoordinatorActor::spawn(CancellationToken::new());
    info!("Coordinator actor started");

    // Build application routes
    let state = AppState {
        coordinator: coordinator.clone(),
        config: Arc::new(config.clone()),
        health: Arc::clone(&health_state),
    };
    let app = build_routes(state, prometheus_handle);

    // Bind listener BEFORE marking ready to fail fast on bind errors
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind listener");
        e
    })?;

    health_state.set_ready();
    info!(addr = %addr, "Room Coordinator listening");

    // Serve until a shutdown signal arrives. The graceful-shutdown future
    // flips readiness off and ends every meeting before the server stops
    // accepting; open sessions then drain as their outbound channels close.
    let shutdown_health = Arc::clone(&health_state);
    let shutdown_coordinator = coordinator.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, initiating graceful shutdown...");

            // Mark as not ready immediately so k8s stops sending traffic
            shutdown_health.set_not_ready();

            if let Err(e) = shutdown_coordinator.shutdown().await {
                warn!(error = %e, "Coordinator shutdown error");
            }
        })
        .await?;

    // The coordinator cancelled itself during shutdown; join its task
    if let Err(e) = actor_task.await {
        warn!(error = %e, "Coordinator task join error");
    }

    info!("Room Coordinator shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
