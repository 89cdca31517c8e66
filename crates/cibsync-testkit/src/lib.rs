//! # cibsync Testkit
//!
//! Testing utilities for cibsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Reference engine**: a small in-memory [`DocumentEngine`] with
//!   scriptable failures
//! - **Recording collaborators**: a transport that captures every send and
//!   a host that captures terminations
//! - **Fixtures**: a replicator wired to all of the above, plus request
//!   builders
//! - **Generators**: proptest strategies for documents, diffs and versions
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use cibsync_testkit::TestFixture;
//!
//! let mut fixture = TestFixture::new();
//! fixture.next_diff("have-quorum", "1").await?;
//! assert_eq!(fixture.transport().sent().len(), 0);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cibsync_testkit::generators::{diff_on, document};
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(doc in document()) {
//!         prop_assert_eq!(versioned_digest(&doc, "3.19.0"), versioned_digest(&doc, "3.19.0"));
//!     }
//! }
//! ```
//!
//! [`DocumentEngine`]: cibsync_replication::DocumentEngine

pub mod engine;
pub mod fixtures;
pub mod generators;
pub mod recording;

pub use engine::{apply_changes, ReferenceEngine};
pub use fixtures::{
    base_document, cib_at, diff_from, diff_request, replace_request, schema_catalog,
    transaction_request, TestFixture, TestReplicator, BASE_SCHEMA, LOCAL_NODE, PEERS,
};
pub use recording::{RecordingHost, RecordingTransport, Sent};
