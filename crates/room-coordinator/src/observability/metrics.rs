//! Metrics definitions for the room coordinator.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rc_` prefix for the room coordinator
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `event_type`: one value per client event variant (~15 values)
//! - `reason`: room deletion reasons (3 values)

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Event handling happens on the coordinator loop; anything beyond a
        // few milliseconds stalls every room on the instance.
        .set_buckets_for_metric(
            Matcher::Prefix("rc_event".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250,
            ],
        )
        .map_err(|e| format!("Failed to set event handling buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Room & Session Metrics (Gauges)
// ============================================================================

/// Set the number of active rooms.
///
/// Metric: `rc_rooms_active`
/// Labels: none
pub fn set_rooms_active(count: u64) {
    // u64 to f64 conversion is safe for realistic room counts (< 2^53)
    #[allow(clippy::cast_precision_loss)]
    gauge!("rc_rooms_active").set(count as f64);
}

/// Set the number of registered realtime connections.
///
/// Metric: `rc_sessions_connected`
/// Labels: none
pub fn set_sessions_connected(count: u64) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("rc_sessions_connected").set(count as f64);
}

// ============================================================================
// Lifecycle Counters
// ============================================================================

/// Record a room creation.
///
/// Metric: `rc_rooms_created_total`
/// Labels: none
pub fn record_room_created() {
    counter!("rc_rooms_created_total").increment(1);
}

/// Record a room deletion.
///
/// Metric: `rc_rooms_deleted_total`
/// Labels: `reason` (expired, emptied, ended)
pub fn record_room_deleted(reason: &str) {
    counter!("rc_rooms_deleted_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Event Counters & Latency
// ============================================================================

/// Record one processed client event.
///
/// Metric: `rc_events_processed_total`
/// Labels: `event_type` (bounded by the protocol event variants)
pub fn record_event_processed(event_type: &str) {
    counter!("rc_events_processed_total", "event_type" => event_type.to_string()).increment(1);
}

/// Record an outbound event dropped because the receiving connection was
/// slow or already closed.
///
/// Metric: `rc_outbound_dropped_total`
/// Labels: none
///
/// Non-zero values mean some client missed events and will resync on its
/// next join.
pub fn record_outbound_dropped() {
    counter!("rc_outbound_dropped_total").increment(1);
}

/// Record how long one coordinator message took to handle.
///
/// Metric: `rc_event_handling_seconds`
/// Labels: none
pub fn record_event_handling(duration: Duration) {
    histogram!("rc_event_handling_seconds").record(duration.as_secs_f64());
}

/// Record a media credential request.
///
/// Metric: `rc_credentials_issued_total`
/// Labels: `status` (success, invalid, unconfigured, error)
pub fn record_credential_request(status: &str) {
    counter!("rc_credentials_issued_total", "status" => status.to_string()).increment(1);
}
