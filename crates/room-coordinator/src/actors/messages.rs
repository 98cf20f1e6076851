//! Message types for the coordinator actor.
//!
//! Every inbound path (gateway frames, disconnects, fired timers, status
//! probes) funnels into [`CoordinatorMessage`] and is processed one message
//! at a time, which is what makes room mutations atomic without locks.
//! Request-reply messages carry a `tokio::sync::oneshot` response channel.

use common::types::{RoomId, SessionId};
use tokio::sync::{mpsc, oneshot};

use crate::errors::CoordinatorError;
use crate::protocol::{ClientEvent, ParticipantInfo, ServerEvent};

/// Messages sent to `CoordinatorActor`.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Register a connection's outbound sender.
    ///
    /// Sent by the gateway before it reads any frame from the socket, so no
    /// event for this session can arrive before the coordinator can answer.
    RegisterSession {
        session_id: SessionId,
        sender: mpsc::Sender<ServerEvent>,
        /// Response channel for registration confirmation.
        respond_to: oneshot::Sender<Result<(), CoordinatorError>>,
    },

    /// A decoded protocol event from one connection.
    ClientEvent {
        session_id: SessionId,
        event: ClientEvent,
    },

    /// The connection closed for any reason; clean up whatever the session
    /// was part of.
    SessionDisconnected { session_id: SessionId },

    /// A room's deferred-deletion timer fired.
    ///
    /// Emptiness and generation are re-validated on receipt; a stale tick
    /// from an already-replaced timer is ignored.
    RoomExpired { room_id: RoomId, generation: u64 },

    /// Get coordinator-wide counts (for health checks and logs).
    GetStatus {
        /// Response channel for coordinator status.
        respond_to: oneshot::Sender<CoordinatorStatus>,
    },

    /// Get a point-in-time view of one room (for diagnostics and tests).
    GetRoomSnapshot {
        room_id: RoomId,
        /// Response channel for the snapshot, `None` if the room is gone.
        respond_to: oneshot::Sender<Option<RoomSnapshot>>,
    },

    /// Initiate graceful shutdown: end every room, then stop the loop.
    Shutdown {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<()>,
    },
}

/// Coordinator-wide counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStatus {
    /// Number of active rooms.
    pub rooms: usize,

    /// Number of registered connections.
    pub sessions: usize,
}

/// Point-in-time view of one room.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub creator: SessionId,
    /// Members ordered by join time.
    pub members: Vec<ParticipantInfo>,
    /// Waiting-room entries.
    pub pending: Vec<PendingInfo>,
    /// Sessions with retained telemetry (members and departed alike).
    pub telemetry_sessions: Vec<SessionId>,
    /// Whether a deferred-deletion timer is currently armed.
    pub expiry_armed: bool,
}

/// Waiting-room entry in a [`RoomSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInfo {
    pub session_id: SessionId,
    pub display_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_copyable() {
        let status = CoordinatorStatus {
            rooms: 2,
            sessions: 5,
        };
        let copy = status;
        assert_eq!(status, copy);
    }

    #[test]
    fn test_room_snapshot_clone() {
        let creator = SessionId::new();
        let snapshot = RoomSnapshot {
            room_id: RoomId::from("r1"),
            creator,
            members: vec![ParticipantInfo {
                session_id: creator,
                display_name: "Ana".to_string(),
                is_host: true,
            }],
            pending: vec![],
            telemetry_sessions: vec![creator],
            expiry_armed: false,
        };

        let clone = snapshot.clone();
        assert_eq!(clone, snapshot);
        assert_eq!(clone.members.len(), 1);
    }

    #[test]
    fn test_messages_are_debuggable() {
        let (tx, _rx) = oneshot::channel();
        let msg = CoordinatorMessage::GetStatus { respond_to: tx };
        let debug = format!("{msg:?}");
        assert!(debug.contains("GetStatus"));

        let msg = CoordinatorMessage::RoomExpired {
            room_id: RoomId::from("r1"),
            generation: 3,
        };
        let debug = format!("{msg:?}");
        assert!(debug.contains("RoomExpired"));
    }
}
