//! A small in-memory document engine.
//!
//! Enough of the real engine's behavior to drive the replication core:
//! diffs apply only on top of the exact version they were computed from,
//! transactions are all-or-nothing, and validation reaches whatever schema
//! the test configures. Failures can be scripted ahead of time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use cibsync_core::document::attrs;
use cibsync_core::{Change, Diff, Document, Envelope, SchemaVersion, Transaction, VersionTriple};
use cibsync_replication::{Client, DocumentEngine, EngineError, ValidationOutcome};

/// Apply `changes` to the root of `doc`.
///
/// Removing a child that does not exist is an error; everything else
/// always succeeds.
pub fn apply_changes(doc: &mut Document, changes: &[Change]) -> Result<(), String> {
    for change in changes {
        match change {
            Change::SetAttribute { name, value } => doc.set_attr(name.clone(), value.clone()),
            Change::RemoveAttribute { name } => {
                doc.remove_attr(name);
            }
            Change::UpsertChild(child) => {
                match doc.children.iter_mut().find(|c| c.name == child.name) {
                    Some(existing) => *existing = child.clone(),
                    None => doc.children.push(child.clone()),
                }
            }
            Change::RemoveChild { name } => {
                let before = doc.children.len();
                doc.children.retain(|c| &c.name != name);
                if doc.children.len() == before {
                    return Err(format!("no <{name}> element to remove"));
                }
            }
        }
    }
    Ok(())
}

/// Reference [`DocumentEngine`] for tests.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    reachable: Option<SchemaVersion>,
    validation_error: Option<EngineError>,
    scripted_diff_failures: Mutex<VecDeque<EngineError>>,
    diffs_applied: AtomicUsize,
    validations: AtomicUsize,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validation reaches `version`.
    pub fn reaching(mut self, version: SchemaVersion) -> Self {
        self.reachable = Some(version);
        self
    }

    /// Validation fails with `error`.
    pub fn failing_validation(mut self, error: EngineError) -> Self {
        self.validation_error = Some(error);
        self
    }

    /// The next `apply_diff` call fails with `error`, whatever the diff.
    pub fn fail_next_diff(&self, error: EngineError) {
        lock(&self.scripted_diff_failures).push_back(error);
    }

    /// Number of diffs handed to the engine so far, applied or not.
    pub fn diffs_applied(&self) -> usize {
        self.diffs_applied.load(Ordering::SeqCst)
    }

    pub fn validations(&self) -> usize {
        self.validations.load(Ordering::SeqCst)
    }
}

impl DocumentEngine for ReferenceEngine {
    fn apply_diff(
        &self,
        _request: &Envelope,
        diff: &Diff,
        current: &Document,
    ) -> Result<Document, EngineError> {
        self.diffs_applied.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.scripted_diff_failures).pop_front() {
            return Err(error);
        }

        let version = current.version();
        if diff.to <= version {
            return Err(EngineError::OldData);
        }
        if diff.from != version {
            return Err(EngineError::DiffResync(format!(
                "diff starts at {} but we are at {}",
                diff.from, version
            )));
        }

        let mut next = current.clone();
        apply_changes(&mut next, &diff.changes).map_err(EngineError::DiffFailed)?;
        next.set_version(diff.to);
        Ok(next)
    }

    fn apply_replace(
        &self,
        _request: &Envelope,
        replacement: &Document,
        current: Option<&Document>,
    ) -> Result<Document, EngineError> {
        if replacement.is_cib_root() {
            return Ok(replacement.clone());
        }

        let current = current.ok_or_else(|| {
            EngineError::InvalidArgument(format!(
                "cannot replace <{}> without a document",
                replacement.name
            ))
        })?;
        let mut next = current.clone();
        apply_changes(&mut next, &[Change::UpsertChild(replacement.clone())])
            .map_err(EngineError::Rejected)?;
        next.set_version(current.version().next_update());
        Ok(next)
    }

    fn validate_and_upgrade(&self, working: &mut Document) -> ValidationOutcome {
        self.validations.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.validation_error {
            return ValidationOutcome::failed(error.clone());
        }
        match self.reachable {
            Some(version) => {
                working.set_attr(attrs::VALIDATE_WITH, version.name());
                ValidationOutcome::reached(version)
            }
            None => ValidationOutcome {
                status: Ok(()),
                reached: working.validate_with().and_then(|name| name.parse().ok()),
            },
        }
    }

    fn upgrade(&self, request: &Envelope, current: &Document) -> Result<Document, EngineError> {
        let target = request
            .schema_max
            .as_deref()
            .ok_or_else(|| EngineError::InvalidArgument("no target schema".into()))?;
        let version: SchemaVersion = target
            .parse()
            .map_err(|_| EngineError::TransformFailed(format!("unknown schema {target}")))?;

        let mut next = current.clone();
        next.set_attr(attrs::VALIDATE_WITH, version.name());
        let v = current.version();
        next.set_version(VersionTriple::new(v.admin_epoch, v.epoch + 1, 0));
        Ok(next)
    }

    fn commit_transaction(
        &self,
        transaction: &Transaction,
        _client: Option<&Client>,
        _origin: Option<&str>,
        current: &Document,
    ) -> Result<Document, EngineError> {
        let mut next = current.clone();
        apply_changes(&mut next, &transaction.changes).map_err(EngineError::Rejected)?;
        next.set_version(current.version().next_update());
        Ok(next)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
