//! Actor model for the room coordinator.
//!
//! One actor owns everything:
//!
//! ```text
//! CoordinatorActor (singleton per instance)
//! ├── owns every Room (members, waiting room, telemetry, expiry timer)
//! ├── owns the session-to-room index
//! └── owns the outbound channel per connection
//! ```
//!
//! # Key Design Decisions
//!
//! - **One mailbox, one message at a time**: room mutations are atomic and
//!   per-room event order follows arrival order, with no locks anywhere
//! - **Non-blocking fan-out**: outbound events use bounded channels and
//!   `try_send`, so a slow client drops events instead of stalling the loop
//! - **Timers post back**: expiry timers are plain tasks that send a tick to
//!   the mailbox; the coordinator re-validates before deleting
//!
//! # Modules
//!
//! - [`coordinator`] - `CoordinatorActor` singleton and its handle
//! - [`room`] - per-room state owned by the coordinator
//! - [`messages`] - message types for the coordinator mailbox

pub mod coordinator;
pub mod messages;
pub mod room;

// Re-export primary types
pub use coordinator::{CoordinatorActor, CoordinatorHandle};
pub use messages::*;
pub use room::{RemovedRole, Room};
