use serde::{Deserialize, Serialize};

/// Diff engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Embed a copy of each referenced entity inside event links.
    ///
    /// Event consumers usually outlive the snapshots that produced the
    /// events, so links without a fallback copy may no longer resolve.
    /// Disable only when consumers hold on to the snapshot trees and the
    /// extra copies matter.
    pub fallback_links: bool,

    /// Backfill `joined_at`/`created_at` on entities first seen without
    /// one, from the older snapshot or the record's construction time.
    pub backfill_timestamps: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            fallback_links: true,
            backfill_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiffConfig::default();
        assert!(config.fallback_links);
        assert!(config.backfill_timestamps);
    }
}
