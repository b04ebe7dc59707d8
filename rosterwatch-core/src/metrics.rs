use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Accumulated counters and timings across diff runs.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct DiffMetrics {
    pub snapshots_compared: u64,
    pub events_emitted: u64,
    pub players_matched: u64,
    pub players_joined: u64,
    pub players_left: u64,
    pub total_time: Duration,
    pub players_time: Duration,
    pub squads_time: Duration,
    pub teams_time: Duration,
    /// Server-field pass plus the final batch merge.
    pub server_time: Duration,
}

impl DiffMetrics {
    pub fn compare_avg_ms(&self) -> f64 {
        if self.snapshots_compared == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() * 1000.0 / self.snapshots_compared as f64
        }
    }

    pub fn events_per_compare(&self) -> f64 {
        if self.snapshots_compared == 0 {
            0.0
        } else {
            self.events_emitted as f64 / self.snapshots_compared as f64
        }
    }
}
