//! Cluster-wide schema upgrade negotiation.
//!
//! An upgrade runs in two phases. The originating node sends a plain
//! upgrade request; the receiving node validates a private copy of its
//! document to find the newest reachable schema and, if there is one,
//! re-broadcasts the request with `schema_max` set. Every node then applies
//! that verified request and notifies its own clients. A rejected request
//! is relayed back to the originator so it can notify its clients too.

use tracing::{info, trace, warn};

use cibsync_core::{Document, Envelope, Operation, SchemaVersion};

use crate::error::{ReplicationError, Result};
use crate::replicator::{Replicator, Reply};
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Handle an upgrade request in whichever phase it is in.
    pub async fn process_upgrade(
        &self,
        request: &Envelope,
        current: Option<&Document>,
    ) -> Result<Reply> {
        if request.schema_max.is_some() {
            return self.apply_upgrade(request, current);
        }

        trace!("Processing \"{}\" event", Operation::Upgrade);
        let result = self.verify_upgrade(request, current).await;
        if let Err(e) = &result {
            self.reject_upgrade(request, e).await;
        }
        result
    }

    /// Phase 2: perform an already-verified upgrade.
    fn apply_upgrade(&self, request: &Envelope, current: Option<&Document>) -> Result<Reply> {
        let current = current.ok_or(ReplicationError::MissingDocument)?;
        let upgraded = self.engine.upgrade(request, current)?;
        Ok(Reply::with_document(upgraded))
    }

    /// Phase 1: check that an upgrade is possible and start it cluster-wide.
    async fn verify_upgrade(&self, request: &Envelope, current: Option<&Document>) -> Result<Reply> {
        let current = current.ok_or(ReplicationError::MissingDocument)?;
        let host = request.src.as_deref().unwrap_or("unknown peer");

        let current_version = current
            .validate_with()
            .and_then(|name| name.parse::<SchemaVersion>().ok());

        // Validation may transform the copy; the live document is never touched.
        let mut scratch = current.clone();
        let outcome = self.engine.validate_and_upgrade(&mut scratch);
        drop(scratch);

        let new_version = match outcome.reached {
            Some(reached) if Some(reached) > current_version => reached,
            _ => {
                outcome.status?;
                return Err(ReplicationError::SchemaUnchanged);
            }
        };

        info!("Upgrade request from {} verified", host);

        let mut up = Envelope::new(Operation::Upgrade);
        up.schema_max = Some(new_version.name());
        up.delegated_from = request.src.clone();
        up.client_id = request.client_id.clone();
        up.call_options = request.call_options;
        up.call_id = request.call_id.clone();

        if self.config.legacy_mode && self.is_primary().await {
            return self.apply_upgrade(&up, Some(current));
        }

        if let Err(e) = self.transport.send(None, up, false).await {
            warn!("Could not broadcast verified upgrade to {}: {}", new_version.name(), e);
        }
        Ok(Reply::empty())
    }

    /// Tell the originating peer its upgrade request was rejected.
    async fn reject_upgrade(&self, request: &Envelope, error: &ReplicationError) {
        let host = request.src.as_deref();
        if host.is_some_and(|name| name == self.local_identity()) {
            info!("Rejecting local upgrade request: {} (rc={})", error, error.code());
            return;
        }

        let origin = match host {
            Some(name) => self.transport.lookup_node(name).await,
            None => None,
        };

        info!(
            "Rejecting upgrade request from {}: {} (rc={} peer={})",
            host.unwrap_or("unknown peer"),
            error,
            error.code(),
            origin.as_ref().map_or("lost", |p| p.uname.as_str())
        );

        let Some(origin) = origin else {
            return;
        };

        let mut up = Envelope::new(Operation::Upgrade);
        up.delegated_from = request.src.clone();
        up.is_reply_to = request.src.clone();
        up.client_id = request.client_id.clone();
        up.call_options = request.call_options;
        up.call_id = request.call_id.clone();
        up.upgrade_rc = Some(error.code());

        if let Err(e) = self.transport.send(Some(&origin), up, true).await {
            warn!("Could not send upgrade result to {}: {}", origin, e);
        }
    }
}
