//! Node configuration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cibsync_replication::ReplicationConfig;

use crate::error::Result;

/// Configuration for a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Replication core settings.
    pub replication: ReplicationConfig,
}

impl NodeConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(NodeConfig::from_json("{}").unwrap(), NodeConfig::default());
    }

    #[test]
    fn test_nested_overrides() {
        let config =
            NodeConfig::from_json(r#"{ "replication": { "detailed_ping": true, "max_diff_retry": 3 } }"#)
                .unwrap();
        assert!(config.replication.detailed_ping);
        assert_eq!(config.replication.max_diff_retry, 3);
        assert!(!config.replication.legacy_mode);
    }

    #[test]
    fn test_malformed_json() {
        assert!(NodeConfig::from_json("{ replication: ").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = NodeConfig::from_file("/nonexistent/cibsync.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cibsync.json"));
    }
}
