//! Inbound diff and replace processing.

use tracing::{debug, info, trace, warn};

use cibsync_core::{CallOptions, Document, Envelope};

use crate::error::{EngineError, ReplicationError, Result};
use crate::replicator::{Replicator, Reply};
use crate::resync::{Admission, ResyncState};
use crate::role::Role;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

/// How to finish a diff the engine could not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Report the engine's error as-is.
    Fail,
    /// Discard any partial result and ask the cluster for a full copy.
    RequestResync,
    /// The primary has nobody to resync from: report a hard failure.
    Downgrade,
}

/// Decide what to do with a failed diff.
pub fn settle(error: &EngineError, role: Role, legacy: bool) -> Settlement {
    match (error, role) {
        (EngineError::DiffResync(_), Role::Secondary) => Settlement::RequestResync,
        (EngineError::DiffResync(_), Role::Primary) => Settlement::Downgrade,
        // A partial apply may have left the document inconsistent.
        (_, Role::Secondary) if legacy => Settlement::RequestResync,
        _ => Settlement::Fail,
    }
}

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Apply an inbound diff, falling back to a full resync when the diff
    /// cannot be trusted.
    pub async fn process_diff(&self, request: &Envelope, current: Option<&Document>) -> Result<Reply> {
        let diff = request
            .diff()
            .ok_or_else(|| ReplicationError::Protocol("diff request carries no diff".into()))?;
        let current = current.ok_or(ReplicationError::MissingDocument)?;

        let mut state = self.state.lock().await;
        let (next, admission) = state.resync.admit(state.role, self.config.max_diff_retry);
        state.resync = next;
        let role = state.role;

        if admission == Admission::Ignore {
            info!(
                "Not applying diff {} -> {} (sync in progress)",
                diff.from, diff.to
            );
            return Err(ReplicationError::ResyncPending {
                from: diff.from,
                to: diff.to,
            });
        }
        drop(state);

        let result = self.engine.apply_diff(request, diff, current);
        trace!(
            "Diff {} -> {} result: {:?} ({})",
            diff.from,
            diff.to,
            result.as_ref().map(Document::version),
            if role.is_primary() { "primary" } else { "secondary" }
        );

        let err = match result {
            Ok(document) => return Ok(Reply::with_document(document)),
            Err(e) => e,
        };

        match settle(&err, role, self.config.legacy_mode) {
            Settlement::Fail => Err(err.into()),
            Settlement::RequestResync => {
                if !matches!(err, EngineError::DiffResync(_)) {
                    warn!(
                        "Requesting full refresh because update {} -> {} failed: {} (rc={})",
                        diff.from,
                        diff.to,
                        err,
                        err.code()
                    );
                }
                self.request_resync(None).await;
                Err(err.into())
            }
            Settlement::Downgrade => {
                if request.options().contains(CallOptions::FORCE_DIFF) {
                    warn!("Not requesting full refresh in R/W mode");
                }
                Err(EngineError::DiffFailed(format!(
                    "diff {} -> {} does not apply to the primary's document",
                    diff.from, diff.to
                ))
                .into())
            }
        }
    }

    /// Replace the document. A whole-document replace satisfies any
    /// outstanding resync.
    pub async fn process_replace(
        &self,
        request: &Envelope,
        current: Option<&Document>,
    ) -> Result<Reply> {
        let replacement = request.document().ok_or_else(|| {
            ReplicationError::Protocol("replace request carries no document".into())
        })?;

        let document = self.engine.apply_replace(request, replacement, current)?;

        if replacement.is_cib_root() {
            let mut state = self.state.lock().await;
            if state.resync.is_pending() {
                debug!("Full replace at {} ends re-sync", document.version());
            }
            state.resync = ResyncState::Idle;
        }

        Ok(Reply::with_document(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resync() -> EngineError {
        EngineError::DiffResync("gap".into())
    }

    fn failed() -> EngineError {
        EngineError::DiffFailed("conflict".into())
    }

    #[test]
    fn test_resync_on_secondary_requests_copy() {
        assert_eq!(settle(&resync(), Role::Secondary, false), Settlement::RequestResync);
        assert_eq!(settle(&resync(), Role::Secondary, true), Settlement::RequestResync);
    }

    #[test]
    fn test_resync_on_primary_downgrades() {
        assert_eq!(settle(&resync(), Role::Primary, false), Settlement::Downgrade);
        assert_eq!(settle(&resync(), Role::Primary, true), Settlement::Downgrade);
    }

    #[test]
    fn test_other_failures_refresh_only_in_legacy_secondary() {
        assert_eq!(settle(&failed(), Role::Secondary, true), Settlement::RequestResync);
        assert_eq!(settle(&failed(), Role::Secondary, false), Settlement::Fail);
        assert_eq!(settle(&failed(), Role::Primary, true), Settlement::Fail);
        assert_eq!(settle(&EngineError::OldData, Role::Primary, false), Settlement::Fail);
    }
}
