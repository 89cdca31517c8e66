//! # cibsync Replication
//!
//! The replication core of a cluster node. It keeps node-local
//! coordination state (write role, outstanding resync, shutdown request)
//! and turns inbound requests into calls on an external document engine
//! plus outbound messages on the cluster transport.
//!
//! ## Roles
//!
//! One node is the primary (authoritative writer); every other node is a
//! secondary. Secondaries apply the primary's diffs; when a diff cannot be
//! trusted they ask for a full copy and ignore further diffs, up to a
//! bounded count, until it arrives.
//!
//! ## Collaborators
//!
//! - [`Transport`] - Cluster messaging and membership lookup
//! - [`DocumentEngine`] - Diff, replace, upgrade and commit primitives
//! - [`Host`] - Client registry and process termination
//!
//! ## Entry Point
//!
//! [`Replicator::handle`] dispatches one request against the caller's
//! current document and returns a [`Reply`]. The caller owns the live
//! document and decides whether to activate a returned one.

pub mod config;
pub mod diff;
pub mod error;
pub mod ping;
pub mod replicator;
pub mod resync;
pub mod role;
pub mod schemas;
pub mod traits;
pub mod transaction;
pub mod transport;
pub mod upgrade;

pub use config::{ReplicationConfig, DEFAULT_MAX_DIFF_RETRY, FEATURE_SET};
pub use diff::{settle, Settlement};
pub use error::{codes, EngineError, ErrorKind, ReplicationError, Result};
pub use replicator::{CoordinationState, Replicator, Reply};
pub use resync::{Admission, ResyncState};
pub use role::Role;
pub use traits::{Client, DocumentEngine, Host, ValidationOutcome};
pub use transaction::transaction_source;
pub use transport::memory::{MemoryNetwork, MemoryTransport};
pub use transport::Transport;
