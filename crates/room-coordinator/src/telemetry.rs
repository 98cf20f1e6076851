//! Per-participant telemetry state.
//!
//! Snapshots arrive at whatever cadence the sender's feature extractor
//! chooses; ingestion is never throttled. `current` always tracks the latest
//! snapshot, while `history` is down-sampled: appends are spaced at least one
//! second apart per sender and capped, oldest first. Spacing is measured on
//! the tokio clock so it can be driven deterministically in paused-time
//! tests; the wall-clock receipt time is kept alongside each sample for the
//! dashboard.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Maximum retained history samples per participant (24h at one per second).
pub const HISTORY_CAP: usize = 86_400;

/// Minimum spacing between two appended history samples.
pub const HISTORY_MIN_SPACING: Duration = Duration::from_secs(1);

/// One retained history sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Wall-clock receipt time, epoch milliseconds.
    pub at: i64,

    /// The opaque records array as received.
    pub records: Value,
}

/// Rolling telemetry state for one participant.
///
/// Outlives membership: the record stays in its room after the participant
/// leaves, so history survives a re-join and stays visible to the creator.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecord {
    current: Value,
    history: VecDeque<TelemetrySample>,
    last_append: Option<Instant>,
}

impl TelemetryRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one snapshot. Returns whether it was appended to history.
    pub fn record(&mut self, records: Value, now: Instant, at_ms: i64) -> bool {
        self.record_capped(records, now, at_ms, HISTORY_CAP)
    }

    fn record_capped(&mut self, records: Value, now: Instant, at_ms: i64, cap: usize) -> bool {
        let appended = match self.last_append {
            Some(last) => now.duration_since(last) >= HISTORY_MIN_SPACING,
            None => true,
        };

        if appended {
            self.history.push_back(TelemetrySample {
                at: at_ms,
                records: records.clone(),
            });
            while self.history.len() > cap {
                self.history.pop_front();
            }
            self.last_append = Some(now);
        }

        self.current = records;
        appended
    }

    #[must_use]
    pub fn current(&self) -> &Value {
        &self.current
    }

    #[must_use]
    pub fn history(&self) -> &VecDeque<TelemetrySample> {
        &self.history
    }
}
