//! # cibsync Core
//!
//! Pure primitives for the replicated configuration store: the document
//! tree, its version triple, the versioned digest, and the typed message
//! envelope exchanged between cluster nodes.
//!
//! This crate contains no I/O, no transport, no process state. It is pure
//! computation over the data every node replicates.
//!
//! ## Key Types
//!
//! - [`Document`] - The replicated configuration tree
//! - [`VersionTriple`] - `(admin_epoch, epoch, num_updates)` ordering anchor
//! - [`Digest`] - Deterministic fingerprint of a document (Blake3)
//! - [`Envelope`] - A protocol message with named optional fields
//! - [`Operation`] - Request operation names understood by the replication core
//!
//! ## Canonicalization
//!
//! Digests are computed over deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod diff;
pub mod digest;
pub mod document;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod schema;
pub mod types;

pub use canonical::canonical_document_bytes;
pub use diff::{Change, Diff, Transaction};
pub use digest::{versioned_digest, Digest};
pub use document::{Document, CIB_ELEMENT};
pub use envelope::{CallData, Envelope, T_CIB};
pub use error::CoreError;
pub use operation::Operation;
pub use schema::{SchemaBundle, SchemaCatalog, SchemaDefinition, SchemaFile, SchemaVersion};
pub use types::{CallOptions, Peer, VersionTriple};
