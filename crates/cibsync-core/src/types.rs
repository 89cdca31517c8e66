//! Strong type definitions shared across the replication core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The version of a document: `(admin_epoch, epoch, num_updates)`.
///
/// Ordering is lexicographic over the three counters, which is the order
/// the cluster uses to decide which copy is newer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct VersionTriple {
    pub admin_epoch: u64,
    pub epoch: u64,
    pub num_updates: u64,
}

impl VersionTriple {
    pub const fn new(admin_epoch: u64, epoch: u64, num_updates: u64) -> Self {
        Self {
            admin_epoch,
            epoch,
            num_updates,
        }
    }

    /// The next version within the same epoch.
    pub const fn next_update(&self) -> Self {
        Self::new(self.admin_epoch, self.epoch, self.num_updates + 1)
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.admin_epoch, self.epoch, self.num_updates)
    }
}

/// A cluster member, as resolved from the membership cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// The node's cluster name.
    pub uname: String,
}

impl Peer {
    pub fn new(uname: impl Into<String>) -> Self {
        Self {
            uname: uname.into(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uname)
    }
}

/// Bit flags carried in a request's call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallOptions(pub u32);

impl CallOptions {
    pub const NONE: Self = Self(0);
    /// Do not wait for a reply.
    pub const DISCARD_REPLY: Self = Self(1 << 4);
    /// Apply only to the local copy.
    pub const SCOPE_LOCAL: Self = Self(1 << 6);
    /// Do not report a diff failure as recoverable.
    pub const FORCE_DIFF: Self = Self(1 << 7);
    /// Process within a transaction.
    pub const TRANSACTION: Self = Self(1 << 10);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for CallOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
