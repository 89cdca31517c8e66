//! Configuration for the replication core.

use serde::{Deserialize, Serialize};

/// Feature set advertised by this implementation.
pub const FEATURE_SET: &str = "3.19.0";

/// Number of diffs ignored while waiting for a resync before giving up.
pub const DEFAULT_MAX_DIFF_RETRY: u32 = 5;

/// Configuration for replication behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Diffs to ignore while a resync is outstanding before resuming
    /// normal processing.
    pub max_diff_retry: u32,
    /// Cluster runs in legacy (non-transactional) compatibility mode.
    pub legacy_mode: bool,
    /// Feature set stamped on outbound replace and ping messages and mixed
    /// into every digest.
    pub feature_set: String,
    /// Always embed the full document in ping replies.
    pub detailed_ping: bool,
    /// Running without cluster membership.
    pub stand_alone: bool,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_diff_retry: DEFAULT_MAX_DIFF_RETRY,
            legacy_mode: false,
            feature_set: FEATURE_SET.to_string(),
            detailed_ping: false,
            stand_alone: false,
        }
    }
}
