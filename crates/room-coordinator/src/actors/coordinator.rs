//! `CoordinatorActor` - the single actor that owns every room on this
//! instance.
//!
//! All room state lives behind one mailbox:
//!
//! - Gateway connections submit decoded [`ClientEvent`]s and disconnects
//! - Expiry timers post their ticks back here
//! - Health and diagnostics read counts through request-reply messages
//!
//! Messages are processed one at a time, which is the whole concurrency
//! story: no room mutation can interleave with another, per-room event order
//! follows arrival order, and the members/pending/telemetry collections can
//! never be observed mid-update. Handlers therefore never await; outbound
//! events go through bounded per-connection channels with `try_send`, so one
//! slow client cannot stall every room on the instance.
//!
//! # Graceful Shutdown
//!
//! On shutdown the coordinator evicts every room, notifying members and
//! waiting-room guests with `meeting-ended`, then stops the loop. Expiry
//! timers are cancelled by drop.

use std::collections::HashMap;

use common::secret::SecretString;
use common::types::{RoomId, SessionId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::actors::messages::{CoordinatorMessage, CoordinatorStatus, RoomSnapshot};
use crate::actors::room::Room;
use crate::errors::CoordinatorError;
use crate::observability::metrics::{
    record_event_handling, record_event_processed, record_outbound_dropped, record_room_created,
    record_room_deleted, set_rooms_active, set_sessions_connected,
};
use crate::policy::{evaluate_gate, GateDecision};
use crate::protocol::{
    truncate_chars, ClientEvent, JoinIntent, ParticipantInfo, RoomOptions, ServerEvent,
    MAX_CHAT_MESSAGE_CHARS, MAX_DISPLAY_NAME_CHARS, MAX_REACTION_CHARS,
};

/// Channel buffer size for the coordinator mailbox.
const COORDINATOR_CHANNEL_BUFFER: usize = 1000;

/// Handle to the `CoordinatorActor`.
///
/// This is the public interface for interacting with the coordinator. It is
/// cheap to clone; every gateway connection holds one.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
}

impl CoordinatorHandle {
    /// Register a connection's outbound sender under its session id.
    ///
    /// Must be called before any event for the session is submitted, so the
    /// coordinator always has somewhere to answer.
    pub async fn register_session(
        &self,
        session_id: SessionId,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(), CoordinatorError> {
        if self.cancel_token.is_cancelled() {
            return Err(CoordinatorError::ShuttingDown);
        }

        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::RegisterSession {
                session_id,
                sender,
                respond_to: tx,
            })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))?
    }

    /// Submit a decoded client event for processing.
    pub async fn client_event(
        &self,
        session_id: SessionId,
        event: ClientEvent,
    ) -> Result<(), CoordinatorError> {
        self.sender
            .send(CoordinatorMessage::ClientEvent { session_id, event })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))
    }

    /// Report that a connection closed, for any reason.
    pub async fn session_disconnected(
        &self,
        session_id: SessionId,
    ) -> Result<(), CoordinatorError> {
        self.sender
            .send(CoordinatorMessage::SessionDisconnected { session_id })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))
    }

    /// Get coordinator-wide counts.
    pub async fn status(&self) -> Result<CoordinatorStatus, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetStatus { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Get a point-in-time view of one room, `None` if it does not exist.
    pub async fn room_snapshot(
        &self,
        room_id: RoomId,
    ) -> Result<Option<RoomSnapshot>, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetRoomSnapshot {
                room_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Initiate graceful shutdown and wait for the rooms to be evicted.
    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|e| CoordinatorError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| CoordinatorError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The `CoordinatorActor` implementation.
///
/// This struct owns the actor state and runs the message loop.
pub struct CoordinatorActor {
    /// Message receiver.
    receiver: mpsc::Receiver<CoordinatorMessage>,
    /// Sender side of the own mailbox, handed to expiry timers.
    self_sender: mpsc::Sender<CoordinatorMessage>,
    /// Cancellation token for shutdown.
    cancel_token: CancellationToken,
    /// Active rooms by id.
    rooms: HashMap<RoomId, Room>,
    /// Which room each session currently belongs to (member or pending).
    session_rooms: HashMap<SessionId, RoomId>,
    /// Outbound channel per registered connection.
    connections: HashMap<SessionId, mpsc::Sender<ServerEvent>>,
}

impl CoordinatorActor {
    /// Spawn the coordinator and return a handle plus the task handle for
    /// monitoring.
    #[must_use]
    pub fn spawn(cancel_token: CancellationToken) -> (CoordinatorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(COORDINATOR_CHANNEL_BUFFER);

        let actor = Self {
            receiver,
            self_sender: sender.clone(),
            cancel_token: cancel_token.clone(),
            rooms: HashMap::new(),
            session_rooms: HashMap::new(),
            connections: HashMap::new(),
        };

        let task = tokio::spawn(actor.run());

        (
            CoordinatorHandle {
                sender,
                cancel_token,
            },
            task,
        )
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "rc.actor.coordinator")]
    async fn run(mut self) {
        info!(target: "rc.actor", "Coordinator started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(target: "rc.actor", "Coordinator received cancellation signal");
                    self.evict_all_rooms();
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            let started = std::time::Instant::now();
                            self.handle_message(message);
                            record_event_handling(started.elapsed());
                        }
                        None => {
                            info!(target: "rc.actor", "Coordinator channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "rc.actor",
            rooms_remaining = self.rooms.len(),
            sessions_remaining = self.connections.len(),
            "Coordinator stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::RegisterSession {
                session_id,
                sender,
                respond_to,
            } => {
                self.connections.insert(session_id, sender);
                set_sessions_connected(self.connections.len() as u64);
                debug!(target: "rc.actor", session_id = %session_id, "Session registered");
                let _ = respond_to.send(Ok(()));
            }

            CoordinatorMessage::ClientEvent { session_id, event } => {
                record_event_processed(event.type_name());
                self.handle_client_event(session_id, event);
            }

            CoordinatorMessage::SessionDisconnected { session_id } => {
                self.handle_disconnect(session_id);
            }

            CoordinatorMessage::RoomExpired {
                room_id,
                generation,
            } => {
                self.handle_room_expired(&room_id, generation);
            }

            CoordinatorMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(CoordinatorStatus {
                    rooms: self.rooms.len(),
                    sessions: self.connections.len(),
                });
            }

            CoordinatorMessage::GetRoomSnapshot {
                room_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.rooms.get(&room_id).map(Room::snapshot));
            }

            CoordinatorMessage::Shutdown { respond_to } => {
                self.evict_all_rooms();
                let _ = respond_to.send(());
                self.cancel_token.cancel();
            }
        }
    }

    /// Dispatch one decoded client event.
    ///
    /// Events from sessions that never registered a connection are dropped;
    /// the gateway always registers before reading frames, so this only
    /// filters events racing a disconnect.
    fn handle_client_event(&mut self, session_id: SessionId, event: ClientEvent) {
        if !self.connections.contains_key(&session_id) {
            debug!(
                target: "rc.actor",
                session_id = %session_id,
                event_type = event.type_name(),
                "Dropping event from unregistered session"
            );
            return;
        }

        match event {
            ClientEvent::Join {
                room_id,
                display_name,
                intent,
            } => self.handle_join(session_id, &room_id, &display_name, intent),

            ClientEvent::Admit { target_session_id } => {
                self.handle_admit(session_id, target_session_id);
            }

            ClientEvent::Reject { target_session_id } => {
                self.handle_reject(session_id, target_session_id);
            }

            ClientEvent::NegotiationOffer {
                target_session_id,
                payload,
            } => self.relay_to_member(
                session_id,
                target_session_id,
                ServerEvent::NegotiationOffer {
                    sender_session_id: session_id,
                    payload,
                },
            ),

            ClientEvent::NegotiationAnswer {
                target_session_id,
                payload,
            } => self.relay_to_member(
                session_id,
                target_session_id,
                ServerEvent::NegotiationAnswer {
                    sender_session_id: session_id,
                    payload,
                },
            ),

            ClientEvent::IceCandidate {
                target_session_id,
                payload,
            } => self.relay_to_member(
                session_id,
                target_session_id,
                ServerEvent::IceCandidate {
                    sender_session_id: session_id,
                    payload,
                },
            ),

            ClientEvent::ChatMessage { text } => self.handle_chat(session_id, &text),

            ClientEvent::MuteAll => self.handle_mute_all(session_id),

            ClientEvent::MuteOne { target_session_id } => {
                self.handle_mute_one(session_id, target_session_id);
            }

            ClientEvent::Kick { target_session_id } => {
                self.handle_kick(session_id, target_session_id);
            }

            ClientEvent::EndMeeting => self.handle_end_meeting(session_id),

            ClientEvent::RaiseHand { raised } => self.handle_raise_hand(session_id, raised),

            ClientEvent::Reaction { reaction } => self.handle_reaction(session_id, &reaction),

            ClientEvent::SetSpotlight { target_session_id } => {
                self.handle_set_spotlight(session_id, target_session_id);
            }

            ClientEvent::TelemetrySnapshot { records } => {
                self.handle_telemetry_snapshot(session_id, records);
            }
        }
    }

    // ========================================================================
    // Join flow
    // ========================================================================

    /// Handle a join request, creating the room when the intent says so.
    fn handle_join(
        &mut self,
        session_id: SessionId,
        room_id: &str,
        display_name: &str,
        intent: JoinIntent,
    ) {
        let room_id = room_id.trim();
        let trimmed_name = display_name.trim();
        if room_id.is_empty() || trimmed_name.is_empty() {
            debug!(
                target: "rc.actor",
                session_id = %session_id,
                "Join refused, blank room id or display name"
            );
            Self::send_event(
                &self.connections,
                session_id,
                ServerEvent::Rejected {
                    reason: crate::protocol::RejectReason::InvalidRequest,
                },
            );
            return;
        }
        let room_id = RoomId::new(room_id);
        let display_name = truncate_chars(trimmed_name, MAX_DISPLAY_NAME_CHARS);

        // A session is in at most one room. A repeat join for the same room
        // re-runs the gate and refreshes; a join for a different room leaves
        // the old one first.
        if let Some(current) = self.session_rooms.get(&session_id).cloned() {
            if current == room_id {
                let password = match intent {
                    JoinIntent::Create { options } => options.password,
                    JoinIntent::Join { password } => password,
                };
                self.handle_rejoin(session_id, &room_id, display_name, password);
                return;
            }
            self.remove_session_from_room(session_id);
        }

        if !self.rooms.contains_key(&room_id) {
            match intent {
                JoinIntent::Create { options } => {
                    self.create_room(session_id, room_id, display_name, options);
                }
                JoinIntent::Join { .. } => {
                    debug!(
                        target: "rc.actor",
                        session_id = %session_id,
                        room_id = %room_id,
                        "Join refused, room does not exist"
                    );
                    Self::send_event(
                        &self.connections,
                        session_id,
                        ServerEvent::Rejected {
                            reason: crate::protocol::RejectReason::RoomNotFound,
                        },
                    );
                }
            }
            return;
        }

        // The room already exists, so a create intent is handled as an
        // ordinary join: whoever created first stays host, and the supplied
        // options are ignored except as a password attempt.
        let password = match intent {
            JoinIntent::Create { options } => options.password,
            JoinIntent::Join { password } => password,
        };
        self.join_existing(session_id, &room_id, display_name, password);
    }

    /// A session re-joining the room it is already part of: the gate applies
    /// again, then the name is refreshed and the appropriate snapshot is
    /// replayed. Membership does not change, so no delta is broadcast.
    fn handle_rejoin(
        &mut self,
        session_id: SessionId,
        room_id: &RoomId,
        display_name: String,
        password: Option<SecretString>,
    ) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };

        match evaluate_gate(&room.gate_policy(), session_id, password.as_ref(), now_ms()) {
            GateDecision::WrongPassword => {
                debug!(
                    target: "rc.actor",
                    session_id = %session_id,
                    room_id = %room_id,
                    "Re-join refused, wrong password"
                );
                Self::send_event(&self.connections, session_id, ServerEvent::WrongPassword);
            }
            GateDecision::NotStarted { scheduled_at } => {
                Self::send_event(
                    &self.connections,
                    session_id,
                    ServerEvent::NotStarted { scheduled_at },
                );
            }
            // Hold cannot demote an existing member; admission was already
            // granted.
            GateDecision::Admit | GateDecision::Hold => {
                if room.is_member(session_id) {
                    room.add_member(session_id, display_name);
                    let is_host = session_id == room.creator();
                    let participants = room.roster();
                    Self::send_event(
                        &self.connections,
                        session_id,
                        ServerEvent::RosterFull {
                            room_id: room_id.clone(),
                            participants,
                            is_host,
                            self_id: session_id,
                        },
                    );
                } else if room.is_pending(session_id) {
                    Self::send_event(&self.connections, session_id, ServerEvent::WaitingForHost);
                }
            }
        }
    }

    /// Create a room and seat the creator, subject to the schedule: a room
    /// can be created before its scheduled start, but not joined.
    fn create_room(
        &mut self,
        creator: SessionId,
        room_id: RoomId,
        display_name: String,
        options: RoomOptions,
    ) {
        let mut room = Room::new(room_id.clone(), creator, options);
        let decision = evaluate_gate(&room.gate_policy(), creator, None, now_ms());

        match decision {
            GateDecision::NotStarted { scheduled_at } => {
                // The room exists but stands empty until the start time. It
                // never transitioned to empty, so only a positive expiry
                // arms a timer; an immediate-expiry room would otherwise be
                // deleted before anyone could come back.
                if room.expiry_minutes() > 0 {
                    room.arm_expiry(self.self_sender.clone());
                }
                self.rooms.insert(room_id.clone(), room);
                record_room_created();
                set_rooms_active(self.rooms.len() as u64);

                info!(
                    target: "rc.actor",
                    room_id = %room_id,
                    session_id = %creator,
                    scheduled_at,
                    "Room created ahead of scheduled start"
                );
                Self::send_event(
                    &self.connections,
                    creator,
                    ServerEvent::NotStarted { scheduled_at },
                );
            }
            _ => {
                room.add_member(creator, display_name);
                let participants = room.roster();
                self.rooms.insert(room_id.clone(), room);
                self.session_rooms.insert(creator, room_id.clone());
                record_room_created();
                set_rooms_active(self.rooms.len() as u64);

                info!(
                    target: "rc.actor",
                    room_id = %room_id,
                    session_id = %creator,
                    "Room created"
                );
                Self::send_event(
                    &self.connections,
                    creator,
                    ServerEvent::RosterFull {
                        room_id,
                        participants,
                        is_host: true,
                        self_id: creator,
                    },
                );
            }
        }
    }

    /// Run the access gate for an existing room and seat or park the
    /// requester accordingly.
    fn join_existing(
        &mut self,
        session_id: SessionId,
        room_id: &RoomId,
        display_name: String,
        password: Option<SecretString>,
    ) {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return;
        };

        match evaluate_gate(&room.gate_policy(), session_id, password.as_ref(), now_ms()) {
            GateDecision::WrongPassword => {
                debug!(
                    target: "rc.actor",
                    session_id = %session_id,
                    room_id = %room_id,
                    "Join refused, wrong password"
                );
                Self::send_event(&self.connections, session_id, ServerEvent::WrongPassword);
            }

            GateDecision::NotStarted { scheduled_at } => {
                debug!(
                    target: "rc.actor",
                    session_id = %session_id,
                    room_id = %room_id,
                    scheduled_at,
                    "Join refused, room not started"
                );
                Self::send_event(
                    &self.connections,
                    session_id,
                    ServerEvent::NotStarted { scheduled_at },
                );
            }

            GateDecision::Hold => {
                let was_empty = room.is_empty();
                room.add_pending(session_id, display_name.clone());
                if was_empty {
                    room.disarm_expiry();
                }
                let creator = room.creator();
                self.session_rooms.insert(session_id, room_id.clone());

                info!(
                    target: "rc.actor",
                    room_id = %room_id,
                    session_id = %session_id,
                    "Participant parked in waiting room"
                );
                Self::send_event(&self.connections, session_id, ServerEvent::WaitingForHost);
                // The creator may still be outside the room, gated by the
                // schedule or yet to return. The notice is addressed to the
                // creator session regardless; an absent connection drops it.
                Self::send_event(
                    &self.connections,
                    creator,
                    ServerEvent::PendingAdded {
                        session_id,
                        display_name,
                    },
                );
            }

            GateDecision::Admit => {
                let was_empty = room.is_empty();
                room.add_member(session_id, display_name.clone());
                if was_empty {
                    room.disarm_expiry();
                }
                let creator = room.creator();
                let is_host = session_id == creator;
                let participants = room.roster();
                let others: Vec<SessionId> =
                    room.member_ids().filter(|m| *m != session_id).collect();
                self.session_rooms.insert(session_id, room_id.clone());

                info!(
                    target: "rc.actor",
                    room_id = %room_id,
                    session_id = %session_id,
                    "Participant joined room"
                );
                Self::send_event(
                    &self.connections,
                    session_id,
                    ServerEvent::RosterFull {
                        room_id: room_id.clone(),
                        participants,
                        is_host,
                        self_id: session_id,
                    },
                );
                let delta = ServerEvent::RosterDeltaJoined {
                    participant: ParticipantInfo {
                        session_id,
                        display_name,
                        is_host,
                    },
                };
                for member in others {
                    Self::send_event(&self.connections, member, delta.clone());
                }
            }
        }
    }

    // ========================================================================
    // Waiting room
    // ========================================================================

    /// Host admits a waiting-room guest.
    fn handle_admit(&mut self, requester: SessionId, target: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        let Some(display_name) = room.move_pending_to_member(target) else {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                target_session_id = %target,
                "Admit ignored, target not in waiting room"
            );
            return;
        };

        let participants = room.roster();
        let others: Vec<SessionId> = room.member_ids().filter(|m| *m != target).collect();

        info!(
            target: "rc.actor",
            room_id = %room_id,
            session_id = %target,
            "Participant admitted from waiting room"
        );
        Self::send_event(
            &self.connections,
            target,
            ServerEvent::Admitted {
                room_id: room_id.clone(),
                participants,
                self_id: target,
            },
        );
        Self::send_event(
            &self.connections,
            requester,
            ServerEvent::PendingRemoved { session_id: target },
        );
        let delta = ServerEvent::RosterDeltaJoined {
            participant: ParticipantInfo {
                session_id: target,
                display_name,
                is_host: false,
            },
        };
        for member in others {
            Self::send_event(&self.connections, member, delta.clone());
        }
    }

    /// Host declines a waiting-room guest.
    fn handle_reject(&mut self, requester: SessionId, target: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if !room.is_pending(target) {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                target_session_id = %target,
                "Reject ignored, target not in waiting room"
            );
            return;
        }

        info!(
            target: "rc.actor",
            room_id = %room_id,
            session_id = %target,
            "Waiting-room participant rejected"
        );
        Self::send_event(
            &self.connections,
            target,
            ServerEvent::Rejected {
                reason: crate::protocol::RejectReason::ByHost,
            },
        );
        self.remove_session_from_room(target);
    }

    // ========================================================================
    // In-room events
    // ========================================================================

    /// Relay an opaque negotiation event to one member of the sender's room.
    ///
    /// A missing sender room, a target outside the room, or a closed target
    /// connection all drop the event silently; negotiation retries are the
    /// clients' concern.
    fn relay_to_member(&self, sender: SessionId, target: SessionId, event: ServerEvent) {
        let Some(room_id) = self.member_room_id(sender) else {
            debug!(target: "rc.actor", session_id = %sender, "Relay from non-member dropped");
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if !room.is_member(target) {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                target_session_id = %target,
                "Relay target not in room, dropped"
            );
            return;
        }

        Self::send_event(&self.connections, target, event);
    }

    fn handle_chat(&self, sender: SessionId, text: &str) {
        let Some(room_id) = self.member_room_id(sender) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        let Some(display_name) = room.member_name(sender) else {
            return;
        };

        let event = ServerEvent::ChatMessage {
            session_id: sender,
            display_name: display_name.to_owned(),
            text: truncate_chars(text, MAX_CHAT_MESSAGE_CHARS),
        };
        for member in room.member_ids().filter(|m| *m != sender) {
            Self::send_event(&self.connections, member, event.clone());
        }
    }

    fn handle_raise_hand(&self, sender: SessionId, raised: bool) {
        let Some(room_id) = self.member_room_id(sender) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };

        let event = ServerEvent::HandRaised {
            session_id: sender,
            raised,
        };
        for member in room.member_ids().filter(|m| *m != sender) {
            Self::send_event(&self.connections, member, event.clone());
        }
    }

    fn handle_reaction(&self, sender: SessionId, reaction: &str) {
        let Some(room_id) = self.member_room_id(sender) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };

        let event = ServerEvent::ReactionBroadcast {
            session_id: sender,
            reaction: truncate_chars(reaction, MAX_REACTION_CHARS),
        };
        for member in room.member_ids().filter(|m| *m != sender) {
            Self::send_event(&self.connections, member, event.clone());
        }
    }

    // ========================================================================
    // Host commands
    // ========================================================================

    /// Host asks everyone else to mute locally.
    fn handle_mute_all(&self, requester: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };

        debug!(target: "rc.actor", room_id = %room_id, "Host muted all participants");
        for member in room.member_ids().filter(|m| *m != requester) {
            Self::send_event(&self.connections, member, ServerEvent::MuteNow);
        }
    }

    /// Host asks one member to mute locally.
    fn handle_mute_one(&self, requester: SessionId, target: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if !room.is_member(target) {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                target_session_id = %target,
                "Mute ignored, target not in room"
            );
            return;
        }

        debug!(target: "rc.actor", room_id = %room_id, target_session_id = %target, "Host muted participant");
        Self::send_event(&self.connections, target, ServerEvent::MuteNow);
    }

    /// Host removes a member or waiting-room guest from the room.
    fn handle_kick(&mut self, requester: SessionId, target: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        if target == requester {
            debug!(target: "rc.actor", room_id = %room_id, "Host tried to kick itself, ignored");
            return;
        }
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if !room.is_member(target) && !room.is_pending(target) {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                target_session_id = %target,
                "Kick ignored, target not in room"
            );
            return;
        }

        info!(
            target: "rc.actor",
            room_id = %room_id,
            session_id = %target,
            "Participant kicked by host"
        );
        Self::send_event(&self.connections, target, ServerEvent::Kicked);
        self.remove_session_from_room(target);
    }

    /// Host ends the meeting for everyone.
    fn handle_end_meeting(&mut self, requester: SessionId) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };

        info!(target: "rc.actor", room_id = %room_id, "Meeting ended by host");
        self.evict_room(&room_id, "ended");
    }

    /// Host sets or clears the room-wide focus hint.
    fn handle_set_spotlight(&self, requester: SessionId, target: Option<SessionId>) {
        let Some(room_id) = self.host_room_id(requester) else {
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            return;
        };
        if let Some(target) = target {
            if !room.is_member(target) {
                debug!(
                    target: "rc.actor",
                    room_id = %room_id,
                    target_session_id = %target,
                    "Spotlight ignored, target not in room"
                );
                return;
            }
        }

        debug!(
            target: "rc.actor",
            room_id = %room_id,
            target_session_id = ?target,
            "Spotlight changed"
        );
        let event = ServerEvent::SpotlightChanged {
            target_session_id: target,
        };
        for member in room.member_ids() {
            Self::send_event(&self.connections, member, event.clone());
        }
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    /// Ingest one telemetry snapshot and push the refreshed dashboard to the
    /// room's creator.
    fn handle_telemetry_snapshot(&mut self, sender: SessionId, records: serde_json::Value) {
        let Some(room_id) = self.member_room_id(sender) else {
            trace!(target: "rc.actor", session_id = %sender, "Telemetry from non-member dropped");
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };

        let appended = room.record_telemetry(sender, records, Instant::now(), now_ms());
        trace!(
            target: "rc.actor",
            room_id = %room_id,
            session_id = %sender,
            appended,
            "Telemetry recorded"
        );

        let creator = room.creator();
        if room.is_member(creator) {
            let participants = room.dashboard();
            Self::send_event(
                &self.connections,
                creator,
                ServerEvent::TelemetryDashboard { participants },
            );
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn handle_disconnect(&mut self, session_id: SessionId) {
        if self.connections.remove(&session_id).is_some() {
            set_sessions_connected(self.connections.len() as u64);
            debug!(target: "rc.actor", session_id = %session_id, "Session disconnected");
        }
        self.remove_session_from_room(session_id);
    }

    /// A room's deferred-deletion timer fired. The tick is re-validated
    /// against the live timer generation and current emptiness; anything
    /// stale is ignored.
    fn handle_room_expired(&mut self, room_id: &RoomId, generation: u64) {
        let Some(room) = self.rooms.get(room_id) else {
            debug!(target: "rc.expiry", room_id = %room_id, "Expiry tick for deleted room ignored");
            return;
        };
        if !room.expiry_generation_matches(generation) {
            debug!(
                target: "rc.expiry",
                room_id = %room_id,
                generation,
                "Stale expiry tick ignored"
            );
            return;
        }
        if !room.is_empty() {
            debug!(target: "rc.expiry", room_id = %room_id, "Expiry tick for occupied room ignored");
            return;
        }

        self.delete_room(room_id, "expired");
    }

    /// Remove a session from whatever room it is part of, notify the
    /// remaining participants, and reconcile room emptiness.
    fn remove_session_from_room(&mut self, session_id: SessionId) {
        let Some(room_id) = self.session_rooms.remove(&session_id) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };

        let role = room.remove_session(session_id);
        if !role.was_member && !role.was_pending {
            return;
        }

        let creator = room.creator();
        let members: Vec<SessionId> = room.member_ids().collect();
        let now_empty = room.is_empty();
        let expiry_minutes = room.expiry_minutes();

        if now_empty && expiry_minutes > 0 {
            room.arm_expiry(self.self_sender.clone());
            info!(
                target: "rc.actor",
                room_id = %room_id,
                expiry_minutes,
                "Room empty, deletion timer armed"
            );
        }

        if role.was_member {
            let event = ServerEvent::RosterDeltaLeft { session_id };
            for member in &members {
                Self::send_event(&self.connections, *member, event.clone());
            }
        }
        if role.was_pending {
            Self::send_event(
                &self.connections,
                creator,
                ServerEvent::PendingRemoved { session_id },
            );
        }

        if now_empty && expiry_minutes <= 0 {
            self.delete_room(&room_id, "emptied");
        }
    }

    /// Delete an empty room outright.
    fn delete_room(&mut self, room_id: &RoomId, reason: &str) {
        if self.rooms.remove(room_id).is_some() {
            record_room_deleted(reason);
            set_rooms_active(self.rooms.len() as u64);
            info!(target: "rc.actor", room_id = %room_id, reason, "Room deleted");
        }
    }

    /// Remove a room that still has participants, telling every member and
    /// waiting-room guest that the meeting is over.
    fn evict_room(&mut self, room_id: &RoomId, reason: &str) {
        let Some(room) = self.rooms.remove(room_id) else {
            return;
        };

        let recipients: Vec<SessionId> = room.member_ids().chain(room.pending_ids()).collect();
        for session_id in recipients {
            self.session_rooms.remove(&session_id);
            Self::send_event(&self.connections, session_id, ServerEvent::MeetingEnded);
        }

        record_room_deleted(reason);
        set_rooms_active(self.rooms.len() as u64);
        info!(target: "rc.actor", room_id = %room_id, reason, "Room evicted");
    }

    /// Evict every room. Used for graceful shutdown; idempotent.
    fn evict_all_rooms(&mut self) {
        if self.rooms.is_empty() {
            return;
        }

        info!(
            target: "rc.actor",
            rooms = self.rooms.len(),
            "Evicting all rooms for shutdown"
        );
        let room_ids: Vec<RoomId> = self.rooms.keys().cloned().collect();
        for room_id in room_ids {
            self.evict_room(&room_id, "ended");
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The room this session is a member of, if any. Waiting-room guests are
    /// not members and cannot act inside the room.
    fn member_room_id(&self, session_id: SessionId) -> Option<RoomId> {
        let room_id = self.session_rooms.get(&session_id)?;
        let room = self.rooms.get(room_id)?;
        room.is_member(session_id).then(|| room_id.clone())
    }

    /// The room this session is the creator of and currently inside.
    /// Any host command from someone else is logged and ignored.
    fn host_room_id(&self, requester: SessionId) -> Option<RoomId> {
        let Some(room_id) = self.member_room_id(requester) else {
            debug!(
                target: "rc.actor",
                session_id = %requester,
                "Host command from non-member ignored"
            );
            return None;
        };
        let room = self.rooms.get(&room_id)?;
        if room.creator() != requester {
            debug!(
                target: "rc.actor",
                room_id = %room_id,
                session_id = %requester,
                "Host command from non-host ignored"
            );
            return None;
        }
        Some(room_id)
    }

    /// Push an event to one connection without blocking the loop. A full or
    /// closed channel drops the event; the client resyncs on its next join.
    fn send_event(
        connections: &HashMap<SessionId, mpsc::Sender<ServerEvent>>,
        session_id: SessionId,
        event: ServerEvent,
    ) {
        let Some(sender) = connections.get(&session_id) else {
            return;
        };
        if let Err(e) = sender.try_send(event) {
            record_outbound_dropped();
            debug!(
                target: "rc.actor",
                session_id = %session_id,
                error = %e,
                "Dropping event for slow or closed connection"
            );
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
