//! The replicator: node coordination state plus the request handlers that
//! read and change it.
//!
//! Every inbound request is dispatched through [`Replicator::handle`] with
//! the node's current document. Handlers never keep the document past the
//! call; a handler that produces a new document returns it in the [`Reply`]
//! and the caller decides whether to activate it.

use tokio::sync::Mutex;
use tracing::{debug, error, trace};

use cibsync_core::{Document, Envelope, Operation, SchemaCatalog};

use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, Result};
use crate::resync::ResyncState;
use crate::role::Role;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

/// Node-local coordination state.
///
/// Role and resync state are read together by the diff path, so both live
/// behind the same lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinationState {
    pub role: Role,
    pub resync: ResyncState,
    /// This node has asked its peers to let it shut down.
    pub shutdown_requested: bool,
}

/// Successful handler result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// New document for the caller to activate. Ownership moves to the caller.
    pub document: Option<Document>,
    /// Answer for the requester.
    pub answer: Option<Envelope>,
}

impl Reply {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            document: Some(document),
            answer: None,
        }
    }

    pub fn with_answer(answer: Envelope) -> Self {
        Self {
            document: None,
            answer: Some(answer),
        }
    }
}

/// Replication core for one node.
pub struct Replicator<T: Transport, E: DocumentEngine, H: Host> {
    pub(crate) transport: T,
    pub(crate) engine: E,
    pub(crate) host: H,
    pub(crate) schemas: SchemaCatalog,
    pub(crate) config: ReplicationConfig,
    pub(crate) state: Mutex<CoordinationState>,
}

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Create a replicator in the secondary role with no resync outstanding.
    pub fn new(
        transport: T,
        engine: E,
        host: H,
        schemas: SchemaCatalog,
        config: ReplicationConfig,
    ) -> Self {
        Self {
            transport,
            engine,
            host,
            schemas,
            config,
            state: Mutex::new(CoordinationState::default()),
        }
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn schemas(&self) -> &SchemaCatalog {
        &self.schemas
    }

    /// A consistent copy of the coordination state.
    pub async fn snapshot(&self) -> CoordinationState {
        *self.state.lock().await
    }

    pub async fn resync_state(&self) -> ResyncState {
        self.state.lock().await.resync
    }

    /// Name this node uses when delegating requests.
    pub(crate) fn local_identity(&self) -> String {
        if self.config.stand_alone {
            return "localhost".to_string();
        }
        self.transport
            .local_name()
            .unwrap_or_else(|| "localhost".to_string())
    }

    /// Process one inbound request against the current document.
    pub async fn handle(&self, request: &Envelope, current: Option<&Document>) -> Result<Reply> {
        let op = request
            .op
            .ok_or_else(|| ReplicationError::Protocol("request carries no operation".into()))?;

        trace!(
            "Processing \"{}\" event from {}",
            op,
            request.src.as_deref().unwrap_or("local")
        );

        let result = match op {
            Operation::ShutdownRequest => self
                .request_shutdown(request.src.as_deref(), request.is_reply())
                .await
                .map(|()| {
                    Self::shutdown_ack(request).map_or_else(Reply::empty, Reply::with_answer)
                }),
            Operation::Noop => Ok(Reply::empty()),
            Operation::IsPrimary | Operation::BecomePrimary | Operation::BecomeSecondary => self
                .request_role_change(op)
                .await
                .map(|()| Reply::empty()),
            Operation::SyncToOne | Operation::SyncAll => {
                // Only the primary's copy is authoritative.
                if self.is_primary().await {
                    self.build_full_sync(request, op == Operation::SyncAll, current)
                        .await
                        .map(|()| Reply::empty())
                } else {
                    debug!(
                        "Ignoring \"{}\" event from {}: not the primary",
                        op,
                        request.src.as_deref().unwrap_or("local")
                    );
                    Ok(Reply::empty())
                }
            }
            Operation::Upgrade => self.process_upgrade(request, current).await,
            Operation::ApplyDiff => self.process_diff(request, current).await,
            Operation::Replace => self.process_replace(request, current).await,
            Operation::DeleteAbsolute => {
                debug!("Rejecting removed operation {}", op);
                Err(ReplicationError::InvalidArgument(format!(
                    "{op} is no longer supported"
                )))
            }
            Operation::CommitTransaction => self.commit_transaction(request, current).await,
            Operation::ListSchemasAfter => self.respond_schemas(request).map(Reply::with_answer),
            Operation::Ping => Ok(Reply::with_answer(self.respond_to_ping(request, current))),
        };

        if let Err(ReplicationError::MissingDocument) = &result {
            error!("Cannot process \"{}\" event: no current document", op);
        }
        result
    }
}
