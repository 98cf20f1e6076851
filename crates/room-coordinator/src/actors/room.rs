//! Per-room state: membership, waiting room, telemetry, expiry timer.
//!
//! A `Room` is plain state owned by the coordinator actor; every mutation
//! happens on the actor's event loop. The three collections (members,
//! pending, telemetry) are kept consistent by the methods here: members and
//! pending stay disjoint, every member has a telemetry record, and telemetry
//! outlives membership so history survives re-joins and stays visible on the
//! creator's dashboard until the room is deleted.

use common::secret::{ExposeSecret, SecretString};
use common::types::{RoomId, SessionId};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::actors::messages::{CoordinatorMessage, PendingInfo, RoomSnapshot};
use crate::expiry::ExpiryTimer;
use crate::policy::GatePolicy;
use crate::protocol::{DashboardEntry, ParticipantInfo, RoomOptions};
use crate::telemetry::TelemetryRecord;

/// One member's record. Carries nothing beyond the display name and the
/// join-order sequence used to keep the roster sorted by join time.
#[derive(Debug, Clone)]
struct Participant {
    display_name: String,
    joined_seq: u64,
}

/// Outcome of removing a session from a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedRole {
    pub was_member: bool,
    pub was_pending: bool,
}

/// An active room.
pub struct Room {
    id: RoomId,
    creator: SessionId,
    password: Option<SecretString>,
    scheduled_at: Option<i64>,
    waiting_room_enabled: bool,
    expiry_minutes: i64,
    members: HashMap<SessionId, Participant>,
    pending: HashMap<SessionId, String>,
    telemetry: HashMap<SessionId, TelemetryRecord>,
    next_join_seq: u64,
    expiry: Option<ExpiryTimer>,
    next_timer_generation: u64,
}

impl Room {
    /// Create a room from wire options. The password is normalized here:
    /// trimmed once, and a password that trims to nothing means no password.
    pub fn new(id: RoomId, creator: SessionId, options: RoomOptions) -> Self {
        let password = options.password.and_then(|p| {
            let trimmed = p.expose_secret().trim().to_owned();
            if trimmed.is_empty() {
                None
            } else {
                Some(SecretString::from(trimmed))
            }
        });

        Self {
            id,
            creator,
            password,
            scheduled_at: options.scheduled_at,
            waiting_room_enabled: options.waiting_room_enabled,
            expiry_minutes: options.expiry_minutes,
            members: HashMap::new(),
            pending: HashMap::new(),
            telemetry: HashMap::new(),
            next_join_seq: 0,
            expiry: None,
            next_timer_generation: 0,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn creator(&self) -> SessionId {
        self.creator
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry_minutes
    }

    /// The policy view handed to the access gate.
    pub fn gate_policy(&self) -> GatePolicy<'_> {
        GatePolicy {
            creator: self.creator,
            password: self.password.as_ref(),
            scheduled_at: self.scheduled_at,
            waiting_room_enabled: self.waiting_room_enabled,
        }
    }

    pub fn is_member(&self, session_id: SessionId) -> bool {
        self.members.contains_key(&session_id)
    }

    pub fn is_pending(&self, session_id: SessionId) -> bool {
        self.pending.contains_key(&session_id)
    }

    /// Empty means no members and nobody in the waiting room. Retained
    /// telemetry does not keep a room alive.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.pending.is_empty()
    }

    pub fn member_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.members.keys().copied()
    }

    pub fn pending_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.pending.keys().copied()
    }

    pub fn member_name(&self, session_id: SessionId) -> Option<&str> {
        self.members
            .get(&session_id)
            .map(|p| p.display_name.as_str())
    }

    pub fn pending_name(&self, session_id: SessionId) -> Option<&str> {
        self.pending.get(&session_id).map(String::as_str)
    }

    /// Add (or refresh) a member. Keeps members/pending disjoint, preserves
    /// the original join order on re-add, and makes sure a telemetry record
    /// exists without discarding history a returning member already earned.
    pub fn add_member(&mut self, session_id: SessionId, display_name: String) {
        self.pending.remove(&session_id);

        match self.members.get_mut(&session_id) {
            Some(existing) => existing.display_name = display_name,
            None => {
                let joined_seq = self.next_join_seq;
                self.next_join_seq += 1;
                self.members.insert(
                    session_id,
                    Participant {
                        display_name,
                        joined_seq,
                    },
                );
            }
        }

        self.telemetry.entry(session_id).or_default();
    }

    /// Park a session in the waiting room.
    pub fn add_pending(&mut self, session_id: SessionId, display_name: String) {
        if !self.members.contains_key(&session_id) {
            self.pending.insert(session_id, display_name);
        }
    }

    /// Promote a waiting-room entry to member. Returns the display name, or
    /// `None` if the session was not pending.
    pub fn move_pending_to_member(&mut self, session_id: SessionId) -> Option<String> {
        let display_name = self.pending.remove(&session_id)?;
        self.add_member(session_id, display_name.clone());
        Some(display_name)
    }

    /// Remove a session from members and pending in one step. Telemetry is
    /// retained; it is discarded only with the room.
    pub fn remove_session(&mut self, session_id: SessionId) -> RemovedRole {
        let was_member = self.members.remove(&session_id).is_some();
        let was_pending = self.pending.remove(&session_id).is_some();
        RemovedRole {
            was_member,
            was_pending,
        }
    }

    /// Full roster ordered by join time.
    pub fn roster(&self) -> Vec<ParticipantInfo> {
        let mut entries: Vec<(&SessionId, &Participant)> = self.members.iter().collect();
        entries.sort_by_key(|(_, p)| p.joined_seq);
        entries
            .into_iter()
            .map(|(session_id, p)| ParticipantInfo {
                session_id: *session_id,
                display_name: p.display_name.clone(),
                is_host: *session_id == self.creator,
            })
            .collect()
    }

    /// Ingest one telemetry snapshot for a member. Returns whether the
    /// sample was appended to history.
    pub fn record_telemetry(
        &mut self,
        session_id: SessionId,
        records: Value,
        now: Instant,
        at_ms: i64,
    ) -> bool {
        self.telemetry
            .entry(session_id)
            .or_default()
            .record(records, now, at_ms)
    }

    /// The creator's combined view: one row per retained telemetry record.
    /// Current members come first in join order; departed sessions follow,
    /// named by a shortened session id.
    pub fn dashboard(&self) -> Vec<DashboardEntry> {
        let mut rows: Vec<(u64, u128, DashboardEntry)> = self
            .telemetry
            .iter()
            .map(|(session_id, record)| {
                let (order, display_name) = match self.members.get(session_id) {
                    Some(p) => (p.joined_seq, p.display_name.clone()),
                    None => {
                        let name = self
                            .pending
                            .get(session_id)
                            .cloned()
                            .unwrap_or_else(|| session_id.short());
                        (u64::MAX, name)
                    }
                };
                (
                    order,
                    session_id.0.as_u128(),
                    DashboardEntry {
                        session_id: *session_id,
                        display_name,
                        current: record.current().clone(),
                        history: record.history().iter().cloned().collect(),
                    },
                )
            })
            .collect();

        rows.sort_by_key(|(order, tiebreak, _)| (*order, *tiebreak));
        rows.into_iter().map(|(_, _, entry)| entry).collect()
    }

    /// Whether a deferred-deletion timer is currently armed.
    pub fn expiry_armed(&self) -> bool {
        self.expiry.is_some()
    }

    /// Arm (or replace) the deferred-deletion timer. The previous timer, if
    /// any, is cancelled by drop; the new one carries a fresh generation so
    /// a stale tick can be told apart from the live timer's.
    pub fn arm_expiry(&mut self, notify: mpsc::Sender<CoordinatorMessage>) {
        self.next_timer_generation += 1;
        let generation = self.next_timer_generation;
        let delay = Duration::from_secs(self.expiry_minutes.unsigned_abs().saturating_mul(60));
        self.expiry = Some(ExpiryTimer::spawn(
            self.id.clone(),
            generation,
            delay,
            notify,
        ));
    }

    /// Cancel any pending deferred deletion.
    pub fn disarm_expiry(&mut self) {
        self.expiry = None;
    }

    /// Whether a fired tick belongs to the currently armed timer.
    pub fn expiry_generation_matches(&self, generation: u64) -> bool {
        self.expiry
            .as_ref()
            .is_some_and(|timer| timer.generation() == generation)
    }

    /// Point-in-time view for diagnostics and tests.
    pub fn snapshot(&self) -> RoomSnapshot {
        let mut pending: Vec<PendingInfo> = self
            .pending
            .iter()
            .map(|(session_id, display_name)| PendingInfo {
                session_id: *session_id,
                display_name: display_name.clone(),
            })
            .collect();
        pending.sort_by_key(|p| p.session_id.0.as_u128());

        let mut telemetry_sessions: Vec<SessionId> = self.telemetry.keys().copied().collect();
        telemetry_sessions.sort_by_key(|s| s.0.as_u128());

        RoomSnapshot {
            room_id: self.id.clone(),
            creator: self.creator,
            members: self.roster(),
            pending,
            telemetry_sessions,
            expiry_armed: self.expiry_armed(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_room(creator: SessionId) -> Room {
        Room::new(RoomId::from("r1"), creator, RoomOptions::default())
    }

    #[test]
    fn test_members_and_pending_stay_disjoint() {
        let creator = SessionId::new();
        let guest = SessionId::new();
        let mut room = open_room(creator);

        room.add_pending(guest, "Bo".to_string());
        assert!(room.is_pending(guest));

        room.add_member(guest, "Bo".to_string());
        assert!(room.is_member(guest));
        assert!(!room.is_pending(guest));
    }

    #[test]
    fn test_roster_is_ordered_by_join_time() {
        let creator = SessionId::new();
        let second = SessionId::new();
        let third = SessionId::new();
        let mut room = open_room(creator);

        room.add_member(creator, "Ana".to_string());
        room.add_member(second, "Bo".to_string());
        room.add_member(third, "Cy".to_string());

        let roster = room.roster();
        let names: Vec<&str> = roster.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Bo", "Cy"]);
        assert!(roster[0].is_host);
        assert!(!roster[1].is_host);
    }

    #[test]
    fn test_re_add_keeps_join_order_and_updates_name() {
        let creator = SessionId::new();
        let second = SessionId::new();
        let mut room = open_room(creator);

        room.add_member(creator, "Ana".to_string());
        room.add_member(second, "Bo".to_string());
        room.add_member(creator, "Ana L.".to_string());

        let roster = room.roster();
        assert_eq!(roster[0].display_name, "Ana L.");
        assert_eq!(roster[0].session_id, creator);
    }

    #[test]
    fn test_remove_session_reports_role() {
        let creator = SessionId::new();
        let guest = SessionId::new();
        let waiting = SessionId::new();
        let stranger = SessionId::new();
        let mut room = open_room(creator);

        room.add_member(guest, "Bo".to_string());
        room.add_pending(waiting, "Cy".to_string());

        assert_eq!(
            room.remove_session(guest),
            RemovedRole {
                was_member: true,
                was_pending: false
            }
        );
        assert_eq!(
            room.remove_session(waiting),
            RemovedRole {
                was_member: false,
                was_pending: true
            }
        );
        assert_eq!(
            room.remove_session(stranger),
            RemovedRole {
                was_member: false,
                was_pending: false
            }
        );
    }

    #[test]
    fn test_empty_counts_pending() {
        let creator = SessionId::new();
        let waiting = SessionId::new();
        let mut room = open_room(creator);
        assert!(room.is_empty());

        room.add_pending(waiting, "Cy".to_string());
        assert!(!room.is_empty());

        room.remove_session(waiting);
        assert!(room.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_telemetry_survives_departure_and_rejoin() {
        let creator = SessionId::new();
        let guest = SessionId::new();
        let mut room = open_room(creator);

        room.add_member(guest, "Bo".to_string());
        room.record_telemetry(guest, json!([{"attention": 0.8}]), Instant::now(), 1_000);
        assert_eq!(room.dashboard().len(), 1);

        room.remove_session(guest);
        // History is retained; the dashboard row falls back to the short id.
        let dashboard = room.dashboard();
        assert_eq!(dashboard.len(), 1);
        assert_eq!(dashboard[0].display_name, guest.short());
        assert_eq!(dashboard[0].history.len(), 1);

        room.add_member(guest, "Bo".to_string());
        let dashboard = room.dashboard();
        assert_eq!(dashboard[0].display_name, "Bo");
        assert_eq!(dashboard[0].history.len(), 1);
    }

    #[test]
    fn test_password_normalized_at_creation() {
        let creator = SessionId::new();

        let room = Room::new(
            RoomId::from("r1"),
            creator,
            RoomOptions {
                password: Some(SecretString::from("  abc  ")),
                ..RoomOptions::default()
            },
        );
        assert_eq!(
            room.gate_policy().password.unwrap().expose_secret(),
            "abc"
        );

        let room = Room::new(
            RoomId::from("r2"),
            creator,
            RoomOptions {
                password: Some(SecretString::from("   ")),
                ..RoomOptions::default()
            },
        );
        assert!(room.gate_policy().password.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_expiry_replaces_previous_timer() {
        let creator = SessionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut room = Room::new(
            RoomId::from("r1"),
            creator,
            RoomOptions {
                expiry_minutes: 1,
                ..RoomOptions::default()
            },
        );

        room.arm_expiry(tx.clone());
        let first_generation = 1;
        assert!(room.expiry_armed());
        assert!(room.expiry_generation_matches(first_generation));

        // Replacing the timer cancels the first task; only the second
        // generation ever fires.
        room.arm_expiry(tx);
        assert!(!room.expiry_generation_matches(first_generation));
        assert!(room.expiry_generation_matches(2));

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        match rx.recv().await {
            Some(CoordinatorMessage::RoomExpired { generation, .. }) => {
                assert_eq!(generation, 2);
            }
            other => assert!(other.is_none(), "unexpected message: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_expiry_cancels() {
        let creator = SessionId::new();
        let (tx, mut rx) = mpsc::channel(8);
        let mut room = Room::new(
            RoomId::from("r1"),
            creator,
            RoomOptions {
                expiry_minutes: 1,
                ..RoomOptions::default()
            },
        );

        room.arm_expiry(tx);
        room.disarm_expiry();
        assert!(!room.expiry_armed());

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
