//! # cibsync
//!
//! A node of a replicated cluster configuration store. One node is the
//! primary writer; the others keep their copies current by applying its
//! incremental diffs and fall back to a full copy when a diff cannot be
//! trusted.
//!
//! ## Overview
//!
//! - **Documents**: an element tree whose root carries an
//!   `(admin_epoch, epoch, num_updates)` version
//! - **Diffs**: transitions between two versions, applied in order
//! - **Resync**: a full copy requested from peers after a bad diff
//! - **Upgrades**: cluster-wide schema upgrades verified by one node
//!   and applied by all
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cibsync::{Node, NodeConfig, NodeHost};
//! use cibsync::replication::MemoryNetwork;
//!
//! let network = MemoryNetwork::new();
//! let transport = network.create_transport("node1").await;
//! let node = Node::new(transport, engine, NodeHost::new(), schemas, NodeConfig::default(), Some(doc));
//!
//! while node.poll(Duration::from_secs(1)).await? {}
//! ```
//!
//! ## Re-exports
//!
//! - `cibsync::core` - Documents, versions, digests, envelopes
//! - `cibsync::replication` - The replication core and its collaborator traits

pub mod config;
pub mod error;
pub mod node;

// Re-export component crates
pub use cibsync_core as core;
pub use cibsync_replication as replication;

pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{Node, NodeHost};

// Re-export commonly used types
pub use cibsync_core::{Diff, Digest, Document, Envelope, Operation, VersionTriple};
pub use cibsync_replication::{ReplicationConfig, ReplicationError, Role};
