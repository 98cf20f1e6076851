//! Parley Room Coordinator Library
//!
//! This library provides the core functionality for the Parley
//! Room Coordinator - a stateful WebSocket signaling server responsible for:
//!
//! - Room lifecycle: creation on first join, expiry when empty, host eviction
//! - Join gatekeeping: passwords, scheduled start times, waiting rooms
//! - Roster fan-out: membership deltas pushed to every affected session
//! - In-meeting signals: chat, raised hands, reactions, host moderation
//! - Pairwise media negotiation relay between members
//! - Media-routing credentials for rooms that outgrow the pairwise relay
//!
//! # Architecture
//!
//! All coordination state lives in a single actor:
//!
//! ```text
//! CoordinatorActor (singleton per instance)
//! ├── owns every Room (members, waiting room, telemetry, expiry timer)
//! ├── owns the session-to-room index
//! └── owns the outbound channel of every connected session
//! ```
//!
//! WebSocket sessions and expiry timers communicate with the actor purely
//! through its mailbox, so room state needs no locks.
//!
//! # Modules
//!
//! - [`actors`] - The coordinator actor, its mailbox protocol and room state
//! - [`config`] - Service configuration from environment
//! - [`errors`] - Error types with close codes and HTTP mappings
//! - [`expiry`] - Cancellable empty-room expiry timers
//! - [`handlers`] - HTTP surface: WebSocket gateway, credentials, metrics
//! - [`observability`] - Health endpoints and Prometheus metrics
//! - [`policy`] - Join gate evaluation (password, schedule, waiting room)
//! - [`protocol`] - Client/server wire events
//! - [`telemetry`] - Per-participant telemetry snapshots and history

pub mod actors;
pub mod config;
pub mod errors;
pub mod expiry;
pub mod handlers;
pub mod observability;
pub mod policy;
pub mod protocol;
pub mod telemetry;
