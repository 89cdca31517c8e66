//! Resync coordination.
//!
//! When a secondary cannot trust its incremental diffs it asks a peer for a
//! full copy of the document and ignores further diffs until the copy
//! arrives. Requests can be lost, so the number of ignored diffs is bounded:
//! past the ceiling the node resumes evaluating diffs, and a diff that still
//! does not apply triggers a fresh request.
//!
//! ```text
//!            request_resync            full replace received
//!   Idle ------------------> Pending(1) -----------------------> Idle
//!                              |  ^
//!          diff on secondary   |  |
//!                              v  |
//!                           Pending(n+1)   (n > ceiling => Idle on next diff)
//! ```

use tracing::{debug, info, warn};

use cibsync_core::{versioned_digest, CallData, Document, Envelope, Operation};

use crate::error::{ReplicationError, Result};
use crate::replicator::Replicator;
use crate::role::Role;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

/// Outstanding-resync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResyncState {
    /// No resync outstanding.
    #[default]
    Idle,
    /// A resync was requested; the count is one more than the number of
    /// diffs ignored since.
    Pending(u32),
}

/// What to do with an inbound diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Hand the diff to the document engine.
    Apply,
    /// Drop the diff; a full copy is on its way.
    Ignore,
}

impl ResyncState {
    /// State right after a resync request goes out.
    pub const fn requested() -> Self {
        ResyncState::Pending(1)
    }

    pub const fn is_pending(self) -> bool {
        matches!(self, ResyncState::Pending(_))
    }

    /// Decide whether a diff arriving in `role` is applied or ignored.
    ///
    /// A primary always applies. A secondary with a resync outstanding
    /// ignores up to `ceiling` diffs, then gives up waiting.
    pub fn admit(self, role: Role, ceiling: u32) -> (ResyncState, Admission) {
        let state = match self {
            ResyncState::Pending(count) if count > ceiling => ResyncState::Idle,
            other => other,
        };

        match (state, role) {
            (ResyncState::Pending(count), Role::Secondary) => (
                ResyncState::Pending(count.saturating_add(1)),
                Admission::Ignore,
            ),
            (state, _) => (state, Admission::Apply),
        }
    }
}

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Ask `target` (or every peer) for a full copy of the document.
    ///
    /// Send failures are logged; the bounded ignore count eventually
    /// releases the pending state if the request never arrives.
    pub async fn request_resync(&self, target: Option<&str>) {
        self.state.lock().await.resync = ResyncState::requested();

        info!("Requesting re-sync from {}", target.unwrap_or("all peers"));

        let mut sync_me = Envelope::new(Operation::SyncToOne);
        sync_me.delegated_from = Some(self.local_identity());

        let peer = match target {
            Some(name) => {
                let peer = self.transport.lookup_node(name).await;
                if peer.is_none() {
                    debug!("Peer {} is not known, asking all peers instead", name);
                }
                peer
            }
            None => None,
        };

        if let Err(e) = self.transport.send(peer.as_ref(), sync_me, false).await {
            warn!("Could not send re-sync request: {}", e);
        }
    }

    /// Send the whole current document to the requester, or to every peer.
    pub async fn build_full_sync(
        &self,
        request: &Envelope,
        broadcast: bool,
        current: Option<&Document>,
    ) -> Result<()> {
        let current = current.ok_or(ReplicationError::MissingDocument)?;
        let host = request.src.as_deref();
        if !broadcast && host.is_none() {
            return Err(ReplicationError::InvalidArgument(
                "sync request has no source host".into(),
            ));
        }

        debug!(
            "Syncing document to {}",
            if broadcast {
                "all peers"
            } else {
                host.unwrap_or_default()
            }
        );

        let mut replace = request.mirror();
        if let Some(host) = host {
            replace.is_reply_to = Some(host.to_string());
        }
        replace.host = if broadcast {
            None
        } else {
            host.map(str::to_string)
        };
        replace.op = Some(Operation::Replace);
        replace.original_op = request.op;
        replace.global_update = Some(true);
        replace.feature_set = Some(self.config.feature_set.clone());
        replace.digest = Some(versioned_digest(current, &self.config.feature_set));
        replace.call_data = Some(CallData::Document(current.clone()));

        let peer = match (broadcast, host) {
            (false, Some(name)) => Some(self.transport.lookup_node(name).await.ok_or_else(|| {
                ReplicationError::NotConnected(format!("peer {name} is not a cluster member"))
            })?),
            _ => None,
        };

        self.transport
            .send(peer.as_ref(), replace, false)
            .await
            .map_err(|e| {
                warn!("Could not sync document: {}", e);
                e
            })
    }
}
