//! Incremental update payloads: diffs and transactions.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::types::VersionTriple;

/// A single edit to the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// Set a root attribute.
    SetAttribute { name: String, value: String },
    /// Remove a root attribute.
    RemoveAttribute { name: String },
    /// Replace the first child with the same name, or append it.
    UpsertChild(Document),
    /// Remove every child with the given name.
    RemoveChild { name: String },
}

/// A transition between two document versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    /// Version the diff applies on top of.
    pub from: VersionTriple,
    /// Version the document has after the diff.
    pub to: VersionTriple,
    pub changes: Vec<Change>,
}

impl Diff {
    pub fn new(from: VersionTriple, to: VersionTriple) -> Self {
        Self {
            from,
            to,
            changes: Vec::new(),
        }
    }

    pub fn with_change(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }
}

/// A client-submitted batch of changes, applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub changes: Vec<Change>,
}

impl Transaction {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
