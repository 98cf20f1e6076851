//! Observability for the room coordinator: health probes and metrics.
//!
//! Metric labels are bounded to prevent cardinality explosion:
//! - `event_type`: one value per protocol event variant
//! - `reason`: room deletion reasons (expired, emptied, ended)
//! - `status`: credential request outcomes
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `rc_rooms_active` | Gauge | none | Current active rooms |
//! | `rc_sessions_connected` | Gauge | none | Registered realtime connections |
//! | `rc_rooms_created_total` | Counter | none | Rooms created |
//! | `rc_rooms_deleted_total` | Counter | `reason` | Rooms deleted, by cause |
//! | `rc_events_processed_total` | Counter | `event_type` | Client events handled |
//! | `rc_outbound_dropped_total` | Counter | none | Events dropped to slow/closed clients |
//! | `rc_event_handling_seconds` | Histogram | none | Coordinator message handling latency |
//! | `rc_credentials_issued_total` | Counter | `status` | Media credential requests |

pub mod health;
pub mod metrics;

// Re-exports for convenience
pub use health::{health_router, HealthState};
pub use metrics::{
    init_metrics_recorder, record_credential_request, record_event_handling,
    record_event_processed, record_outbound_dropped, record_room_created, record_room_deleted,
    set_rooms_active, set_sessions_connected,
};
