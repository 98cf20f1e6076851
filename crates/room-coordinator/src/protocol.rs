//! Wire protocol for the realtime channel.
//!
//! Events are JSON objects tagged by a kebab-case `type` field; payload
//! fields are camelCase. Join intent is a tagged variant decided once here at
//! the boundary: a create always carries room options, a plain join at most a
//! password. Negotiation payloads are never inspected, only carried as raw
//! JSON values.
//!
//! Passwords ride in [`SecretString`] so a logged event can never leak them.

use common::secret::SecretString;
use common::types::{RoomId, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::telemetry::TelemetrySample;

/// Display names are trimmed and truncated to this many characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Chat messages are truncated to this many characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2_000;

/// Reaction types are truncated to this many characters.
pub const MAX_REACTION_CHARS: usize = 20;

/// Events sent by clients over the realtime channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Request to enter a room, creating it when the intent says so.
    Join {
        room_id: String,
        display_name: String,
        intent: JoinIntent,
    },

    /// Host admits a pending participant from the waiting room.
    Admit { target_session_id: SessionId },

    /// Host declines a pending participant.
    Reject { target_session_id: SessionId },

    /// Opaque negotiation offer relayed to one target session.
    NegotiationOffer {
        target_session_id: SessionId,
        payload: Value,
    },

    /// Opaque negotiation answer relayed to one target session.
    NegotiationAnswer {
        target_session_id: SessionId,
        payload: Value,
    },

    /// Opaque transport candidate relayed to one target session.
    IceCandidate {
        target_session_id: SessionId,
        payload: Value,
    },

    /// Text chat to the rest of the room.
    ChatMessage { text: String },

    /// Host asks every other member to mute locally.
    MuteAll,

    /// Host asks one member to mute locally.
    MuteOne { target_session_id: SessionId },

    /// Host removes a participant from the room.
    Kick { target_session_id: SessionId },

    /// Host ends the meeting for everyone.
    EndMeeting,

    /// Raise or lower the sender's hand.
    RaiseHand { raised: bool },

    /// Short reaction broadcast to the rest of the room.
    Reaction { reaction: String },

    /// Host sets (or clears) the room-wide focus hint.
    SetSpotlight {
        target_session_id: Option<SessionId>,
    },

    /// Opaque per-participant telemetry records from the feature extractor.
    TelemetrySnapshot { records: Value },
}

impl ClientEvent {
    /// The wire-level `type` tag, for logs and metric labels.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Admit { .. } => "admit",
            Self::Reject { .. } => "reject",
            Self::NegotiationOffer { .. } => "negotiation-offer",
            Self::NegotiationAnswer { .. } => "negotiation-answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ChatMessage { .. } => "chat-message",
            Self::MuteAll => "mute-all",
            Self::MuteOne { .. } => "mute-one",
            Self::Kick { .. } => "kick",
            Self::EndMeeting => "end-meeting",
            Self::RaiseHand { .. } => "raise-hand",
            Self::Reaction { .. } => "reaction",
            Self::SetSpotlight { .. } => "set-spotlight",
            Self::TelemetrySnapshot { .. } => "telemetry-snapshot",
        }
    }
}

/// Join intent, decided once at the boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum JoinIntent {
    /// Create the room with the supplied options; the creator becomes host.
    Create { options: RoomOptions },

    /// Join an existing room, presenting a password when the room wants one.
    Join {
        #[serde(default)]
        password: Option<SecretString>,
    },
}

/// Room policy options supplied at creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomOptions {
    /// Shared secret required to join; compared trimmed on both sides.
    pub password: Option<SecretString>,

    /// Earliest join instant, epoch milliseconds; joins before it are
    /// refused with a retryable signal.
    pub scheduled_at: Option<i64>,

    /// Hold non-creator joiners in the waiting room until admitted.
    pub waiting_room_enabled: bool,

    /// Minutes of continuous emptiness before the room is deleted;
    /// non-positive deletes immediately on becoming empty.
    pub expiry_minutes: i64,
}

/// Events sent by the coordinator to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full roster snapshot, sent only to a newly joined member.
    RosterFull {
        room_id: RoomId,
        participants: Vec<ParticipantInfo>,
        is_host: bool,
        self_id: SessionId,
    },

    /// One participant joined; sent to everyone already in the room.
    RosterDeltaJoined { participant: ParticipantInfo },

    /// One participant left; sent to the remaining members.
    RosterDeltaLeft { session_id: SessionId },

    /// A guest entered the waiting room; sent to the creator.
    PendingAdded {
        session_id: SessionId,
        display_name: String,
    },

    /// A waiting-room entry went away; sent to the creator.
    PendingRemoved { session_id: SessionId },

    /// Password mismatch; distinct so the UI can re-prompt in place.
    WrongPassword,

    /// Join attempted before the scheduled start; retryable.
    NotStarted { scheduled_at: i64 },

    /// Joiner parked in the waiting room.
    WaitingForHost,

    /// Waiting-room guest promoted to member.
    Admitted {
        room_id: RoomId,
        participants: Vec<ParticipantInfo>,
        self_id: SessionId,
    },

    /// Join refused, or waiting-room guest declined by the host.
    Rejected { reason: RejectReason },

    /// Removed from the room by the host. Terminal for this room.
    Kicked,

    /// The room was ended by the host or the coordinator shut down.
    MeetingEnded,

    /// Chat text from another member.
    ChatMessage {
        session_id: SessionId,
        display_name: String,
        text: String,
    },

    /// The host asked this client to mute its outgoing audio locally.
    MuteNow,

    /// Another member raised or lowered their hand.
    HandRaised { session_id: SessionId, raised: bool },

    /// Another member sent a reaction.
    ReactionBroadcast {
        session_id: SessionId,
        reaction: String,
    },

    /// Room-wide focus hint changed.
    SpotlightChanged {
        target_session_id: Option<SessionId>,
    },

    /// Relayed negotiation offer.
    NegotiationOffer {
        sender_session_id: SessionId,
        payload: Value,
    },

    /// Relayed negotiation answer.
    NegotiationAnswer {
        sender_session_id: SessionId,
        payload: Value,
    },

    /// Relayed transport candidate.
    IceCandidate {
        sender_session_id: SessionId,
        payload: Value,
    },

    /// Combined telemetry view; delivered to the room's creator only.
    TelemetryDashboard { participants: Vec<DashboardEntry> },
}

/// Roster entry for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub session_id: SessionId,
    pub display_name: String,
    pub is_host: bool,
}

/// One participant's row in the creator's telemetry dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    pub session_id: SessionId,
    /// Display name, or a shortened session id once the member is gone.
    pub display_name: String,
    pub current: Value,
    pub history: Vec<TelemetrySample>,
}

/// Why a join (or waiting-room stay) was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    RoomNotFound,
    InvalidRequest,
    ByHost,
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
