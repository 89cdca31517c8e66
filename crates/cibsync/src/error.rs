//! Error types for a node.

use cibsync_replication::ReplicationError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A request handler failed.
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl NodeError {
    /// Numeric wire code to report back to the requester.
    pub fn code(&self) -> i32 {
        match self {
            NodeError::Replication(e) => e.code(),
            NodeError::Config(_) => cibsync_replication::codes::EINVAL,
        }
    }
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
