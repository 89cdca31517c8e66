//! Request operation names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Operations carried in an envelope's `op` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Peer shutdown announcement or acknowledgment.
    ShutdownRequest,
    /// Accepted with no effect. Deprecated.
    Noop,
    /// Ask whether this node is the primary.
    IsPrimary,
    /// Promote this node to primary.
    BecomePrimary,
    /// Demote this node to secondary.
    BecomeSecondary,
    /// Send a full copy of the document to the requesting peer.
    SyncToOne,
    /// Send a full copy of the document to every peer.
    SyncAll,
    /// Two-phase schema upgrade.
    Upgrade,
    /// Apply an incremental diff.
    ApplyDiff,
    /// Replace the document (or a section of it).
    Replace,
    /// Removed capability. Always rejected.
    DeleteAbsolute,
    /// Apply a batch of changes atomically.
    CommitTransaction,
    /// List schemas newer than a given version.
    ListSchemasAfter,
    /// Liveness check carrying the document digest.
    Ping,
}

impl Operation {
    pub const ALL: [Operation; 14] = [
        Operation::ShutdownRequest,
        Operation::Noop,
        Operation::IsPrimary,
        Operation::BecomePrimary,
        Operation::BecomeSecondary,
        Operation::SyncToOne,
        Operation::SyncAll,
        Operation::Upgrade,
        Operation::ApplyDiff,
        Operation::Replace,
        Operation::DeleteAbsolute,
        Operation::CommitTransaction,
        Operation::ListSchemasAfter,
        Operation::Ping,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::ShutdownRequest => "shutdown-request",
            Operation::Noop => "noop",
            Operation::IsPrimary => "is-primary",
            Operation::BecomePrimary => "become-primary",
            Operation::BecomeSecondary => "become-secondary",
            Operation::SyncToOne => "sync-to-one",
            Operation::SyncAll => "sync-all",
            Operation::Upgrade => "upgrade",
            Operation::ApplyDiff => "apply-diff",
            Operation::Replace => "replace",
            Operation::DeleteAbsolute => "delete-absolute",
            Operation::CommitTransaction => "commit-transaction",
            Operation::ListSchemasAfter => "list-schemas-after",
            Operation::Ping => "ping",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| CoreError::UnknownOperation(s.to_string()))
    }
}
