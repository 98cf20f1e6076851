//! Deferred room deletion.
//!
//! Each room owns at most one [`ExpiryTimer`]. The timer is a spawned task
//! that sleeps for the room's expiry duration and then posts a
//! [`CoordinatorMessage::RoomExpired`] back into the coordinator mailbox;
//! deletion itself always happens on the coordinator's event loop, which
//! re-checks that the room is still empty and that the tick came from the
//! current timer generation. Cancel and restart (replace) are the only two
//! operations; dropping the handle cancels the task.

use common::types::RoomId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::actors::messages::CoordinatorMessage;

/// Handle to one room's pending deferred deletion.
#[derive(Debug)]
pub struct ExpiryTimer {
    cancel_token: CancellationToken,
    generation: u64,
}

impl ExpiryTimer {
    /// Spawn a timer that notifies the coordinator after `delay`.
    ///
    /// The mailbox send is best-effort: if the coordinator is gone the tick
    /// has nowhere to go and nothing to clean up.
    #[must_use]
    pub fn spawn(
        room_id: RoomId,
        generation: u64,
        delay: Duration,
        notify: mpsc::Sender<CoordinatorMessage>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    tracing::debug!(
                        target: "rc.expiry",
                        room_id = %room_id,
                        generation,
                        "Expiry timer fired"
                    );
                    let _ = notify
                        .send(CoordinatorMessage::RoomExpired { room_id, generation })
                        .await;
                }
            }
        });

        Self {
            cancel_token,
            generation,
        }
    }

    /// Generation this timer was armed with.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the pending deletion.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
