//! Atomic transaction commit.

use tracing::error;

use cibsync_core::{Document, Envelope};

use crate::error::{ReplicationError, Result};
use crate::replicator::{Replicator, Reply};
use crate::traits::{Client, DocumentEngine, Host};
use crate::transport::Transport;

/// Human-readable label for where a transaction came from.
pub fn transaction_source(client: Option<&Client>, origin: Option<&str>) -> String {
    match (client, origin) {
        (Some(client), _) => format!(
            "client {} ({})",
            client.name.as_deref().unwrap_or("unnamed"),
            client.id
        ),
        (None, Some(origin)) => format!("peer {origin}"),
        (None, None) => "unknown source".to_string(),
    }
}

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Apply every change in the request's transaction, or none of them.
    ///
    /// On success the returned document belongs to the caller, which
    /// activates it and syncs it to the cluster.
    pub async fn commit_transaction(
        &self,
        request: &Envelope,
        current: Option<&Document>,
    ) -> Result<Reply> {
        let transaction = request.transaction().ok_or_else(|| {
            ReplicationError::Protocol("commit request carries no transaction".into())
        })?;
        let current = current.ok_or(ReplicationError::MissingDocument)?;

        let client = request
            .client_id
            .as_deref()
            .and_then(|id| self.host.find_client(id));
        let origin = request.src.as_deref();

        match self
            .engine
            .commit_transaction(transaction, client.as_ref(), origin, current)
        {
            Ok(document) => Ok(Reply::with_document(document)),
            Err(reason) => {
                let source = transaction_source(client.as_ref(), origin);
                error!("Could not commit transaction for {}: {}", source, reason);
                Err(ReplicationError::Transaction {
                    origin: source,
                    reason,
                })
            }
        }
    }
}
