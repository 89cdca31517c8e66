//! Collaborator interfaces consumed by the replication core.
//!
//! The document engine (diff/replace/upgrade/commit primitives and schema
//! validation) and the hosting process (client registry, termination) are
//! owned elsewhere. The replication core only decides *when* to call them
//! and what to do with their results.

use cibsync_core::{Diff, Document, Envelope, SchemaVersion, Transaction};

use crate::error::EngineError;

/// A locally connected client, as known to the client registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub name: Option<String>,
}

impl Client {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Outcome of validating a working copy against its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether validation (and any transform) succeeded.
    pub status: Result<(), EngineError>,
    /// Newest schema the working copy validated against, if any.
    pub reached: Option<SchemaVersion>,
}

impl ValidationOutcome {
    pub fn reached(version: SchemaVersion) -> Self {
        Self {
            status: Ok(()),
            reached: Some(version),
        }
    }

    pub fn failed(error: EngineError) -> Self {
        Self {
            status: Err(error),
            reached: None,
        }
    }
}

/// Document primitives. Every method works on values it is handed and
/// returns a new document; none of them touch the live copy.
pub trait DocumentEngine: Send + Sync {
    /// Apply an incremental diff on top of `current`.
    fn apply_diff(
        &self,
        request: &Envelope,
        diff: &Diff,
        current: &Document,
    ) -> Result<Document, EngineError>;

    /// Replace the document, or the request's section of it.
    fn apply_replace(
        &self,
        request: &Envelope,
        replacement: &Document,
        current: Option<&Document>,
    ) -> Result<Document, EngineError>;

    /// Validate `working` and transform it to the newest schema it can reach.
    fn validate_and_upgrade(&self, working: &mut Document) -> ValidationOutcome;

    /// Upgrade `current` to the schema named in the request.
    fn upgrade(&self, request: &Envelope, current: &Document) -> Result<Document, EngineError>;

    /// Apply every change in `transaction` to a private copy of `current`,
    /// all or nothing.
    fn commit_transaction(
        &self,
        transaction: &Transaction,
        client: Option<&Client>,
        origin: Option<&str>,
        current: &Document,
    ) -> Result<Document, EngineError>;
}

/// Services of the process hosting the replication core.
pub trait Host: Send + Sync {
    /// Look up a connected client by id.
    fn find_client(&self, id: &str) -> Option<Client>;

    /// Begin process termination.
    fn terminate(&self, reason: &str);
}
