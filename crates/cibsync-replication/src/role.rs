//! Primary/secondary role arbitration and shutdown handshakes.
//!
//! The role itself is assigned by the cluster; this node only applies the
//! role-change requests it receives and reports the current value.

use tracing::{debug, error, info, warn};

use cibsync_core::{Envelope, Operation};

use crate::error::{ReplicationError, Result};
use crate::replicator::Replicator;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

/// Write role of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Authoritative writer.
    Primary,
    /// Read-mostly follower.
    #[default]
    Secondary,
}

impl Role {
    pub fn is_primary(self) -> bool {
        matches!(self, Role::Primary)
    }

    /// Role after processing a role-affecting request.
    ///
    /// Only an explicit promotion sets the primary role; any other request
    /// demotes a primary and leaves a secondary alone.
    pub fn after_request(self, op: Operation) -> Role {
        match op {
            Operation::IsPrimary => self,
            Operation::BecomePrimary => Role::Primary,
            _ => Role::Secondary,
        }
    }
}

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    pub async fn is_primary(&self) -> bool {
        self.state.lock().await.role.is_primary()
    }

    /// Apply a role query or role transition.
    ///
    /// A query succeeds only on the primary. Promotion is idempotent.
    pub async fn request_role_change(&self, op: Operation) -> Result<()> {
        let mut state = self.state.lock().await;

        if op == Operation::IsPrimary {
            return if state.role.is_primary() {
                Ok(())
            } else {
                Err(ReplicationError::NotPrimary)
            };
        }

        let next = state.role.after_request(op);
        match (state.role, next) {
            (Role::Secondary, Role::Primary) => info!("We are now in R/W mode"),
            (Role::Primary, Role::Primary) => debug!("We are still in R/W mode"),
            (Role::Primary, Role::Secondary) => info!("We are now in R/O mode"),
            (Role::Secondary, Role::Secondary) => {}
        }
        state.role = next;
        Ok(())
    }

    /// Handle a shutdown message from `request_host`.
    ///
    /// A non-reply is a peer announcing its own shutdown. A reply
    /// acknowledges ours, which is only valid if we asked.
    pub async fn request_shutdown(&self, request_host: Option<&str>, is_reply: bool) -> Result<()> {
        let host = request_host.unwrap_or("unknown peer");

        if !is_reply {
            info!("Peer {} is requesting to shut down", host);
            return Ok(());
        }

        if !self.state.lock().await.shutdown_requested {
            error!("Peer {} mistakenly thinks we wanted to shut down", host);
            return Err(ReplicationError::InvalidState(format!(
                "unsolicited shutdown acknowledgment from {host}"
            )));
        }

        info!("Peer {} has acknowledged our shutdown request", host);
        self.host.terminate("shutdown acknowledged by peer");
        Ok(())
    }

    /// Acknowledgment owed to a peer announcing its shutdown.
    ///
    /// Replies and local requests get none.
    pub(crate) fn shutdown_ack(request: &Envelope) -> Option<Envelope> {
        if request.is_reply() {
            return None;
        }
        let mut ack = Envelope::new(Operation::ShutdownRequest);
        ack.is_reply_to = Some(request.src.clone()?);
        Some(ack)
    }

    /// Ask every peer to acknowledge this node's shutdown.
    pub async fn announce_shutdown(&self) -> Result<()> {
        self.state.lock().await.shutdown_requested = true;

        let mut request = Envelope::new(Operation::ShutdownRequest);
        request.delegated_from = Some(self.local_identity());
        self.transport.send(None, request, false).await.map_err(|e| {
            warn!("Could not announce shutdown: {}", e);
            e
        })
    }
}
