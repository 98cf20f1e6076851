//! Access policy evaluation for join requests.
//!
//! A pure decision function over a room's policy, the requester's identity,
//! the supplied password, and the wall clock. No registry state is read or
//! written here; the coordinator applies the decision. Check order follows
//! the join protocol: password, then schedule, then waiting room. The creator
//! bypasses password and waiting-room checks but not the schedule.

use common::secret::{ExposeSecret, SecretString};
use common::types::SessionId;

/// The slice of room state the gate decides over.
#[derive(Debug)]
pub struct GatePolicy<'a> {
    /// Session that created the room; bypasses password and waiting room.
    pub creator: SessionId,

    /// Required password, already trimmed at room creation.
    pub password: Option<&'a SecretString>,

    /// Earliest join instant, epoch milliseconds.
    pub scheduled_at: Option<i64>,

    /// Whether non-creator joiners wait for admission.
    pub waiting_room_enabled: bool,
}

/// Outcome of gating one join request against one existing room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Admit straight to members.
    Admit,

    /// Park in the waiting room until the creator decides.
    Hold,

    /// Password mismatch; the requester may retry with corrected input.
    WrongPassword,

    /// The room has not reached its scheduled start; retryable.
    NotStarted { scheduled_at: i64 },
}

/// Gate a join request. Both passwords are compared trimmed, exact match.
#[must_use]
pub fn evaluate_gate(
    policy: &GatePolicy<'_>,
    requester: SessionId,
    password: Option<&SecretString>,
    now_ms: i64,
) -> GateDecision {
    let is_creator = requester == policy.creator;

    if !is_creator {
        if let Some(required) = policy.password {
            let supplied = password.map(ExposeSecret::expose_secret).unwrap_or_default();
            if supplied.trim() != required.expose_secret().trim() {
                return GateDecision::WrongPassword;
            }
        }
    }

    if let Some(scheduled_at) = policy.scheduled_at {
        if now_ms < scheduled_at {
            return GateDecision::NotStarted { scheduled_at };
        }
    }

    if policy.waiting_room_enabled && !is_creator {
        return GateDecision::Hold;
    }

    GateDecision::Admit
}
