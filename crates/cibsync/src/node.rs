//! A node: the live document plus the replication core that updates it.
//!
//! All requests run one at a time against the live document. A handler
//! sees the document as it was when the request started and its result is
//! activated before the next request begins, so transactions and inbound
//! diffs never interleave.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use cibsync_core::{versioned_digest, Digest, Document, Envelope, SchemaCatalog, VersionTriple};
use cibsync_replication::{Client, DocumentEngine, Host, Replicator, Transport};

use crate::config::NodeConfig;
use crate::error::Result;

/// [`Host`] for a standalone node process.
///
/// Keeps the registry of locally connected clients and turns a
/// termination request into a shutdown signal subscribers can await.
#[derive(Debug)]
pub struct NodeHost {
    clients: RwLock<HashMap<String, Client>>,
    shutdown: watch::Sender<Option<String>>,
}

impl NodeHost {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(None);
        Self {
            clients: RwLock::new(HashMap::new()),
            shutdown,
        }
    }

    pub fn register_client(&self, client: Client) {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.insert(client.id.clone(), client);
    }

    pub fn unregister_client(&self, id: &str) -> Option<Client> {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.remove(id)
    }

    /// Receiver that holds the termination reason once shutdown starts.
    pub fn subscribe_shutdown(&self) -> watch::Receiver<Option<String>> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.borrow().is_some()
    }
}

impl Default for NodeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for NodeHost {
    fn find_client(&self, id: &str) -> Option<Client> {
        let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
        clients.get(id).cloned()
    }

    fn terminate(&self, reason: &str) {
        info!("Shutting down: {}", reason);
        self.shutdown.send_replace(Some(reason.to_string()));
    }
}

/// One cluster node.
pub struct Node<T: Transport, E: DocumentEngine, H: Host> {
    replicator: Replicator<T, E, H>,
    /// The live document. Held for the whole of each request.
    document: Mutex<Option<Document>>,
}

impl<T: Transport, E: DocumentEngine, H: Host> Node<T, E, H> {
    /// Create a node. It starts as a secondary.
    pub fn new(
        transport: T,
        engine: E,
        host: H,
        schemas: SchemaCatalog,
        config: NodeConfig,
        document: Option<Document>,
    ) -> Self {
        Self {
            replicator: Replicator::new(transport, engine, host, schemas, config.replication),
            document: Mutex::new(document),
        }
    }

    pub fn replicator(&self) -> &Replicator<T, E, H> {
        &self.replicator
    }

    /// Copy of the live document.
    pub async fn current_document(&self) -> Option<Document> {
        self.document.lock().await.clone()
    }

    pub async fn version(&self) -> Option<VersionTriple> {
        self.document.lock().await.as_ref().map(Document::version)
    }

    /// Digest of the live document under this node's feature set.
    pub async fn digest(&self) -> Option<Digest> {
        let feature_set = &self.replicator.config().feature_set;
        self.document
            .lock()
            .await
            .as_ref()
            .map(|doc| versioned_digest(doc, feature_set))
    }

    /// Process one request and activate the document it produces, if any.
    ///
    /// On error the live document is left exactly as it was. The document
    /// lock is held across the handler's sends, which is safe only because
    /// [`Transport::send`] never waits on the receiving node.
    pub async fn process(&self, request: &Envelope) -> Result<Option<Envelope>> {
        let mut live = self.document.lock().await;
        let reply = self.replicator.handle(request, live.as_ref()).await?;

        if let Some(document) = reply.document {
            debug!(
                "Activating document {} (was {})",
                document.version(),
                live.as_ref()
                    .map_or_else(|| "none".to_string(), |d| d.version().to_string())
            );
            *live = Some(document);
        }
        Ok(reply.answer)
    }

    /// Receive and process one envelope from the cluster.
    ///
    /// Returns `Ok(false)` if nothing arrived in time. A request that fails
    /// is logged, not returned; the node keeps running. Answers to requests
    /// (not to replies) go back to the sending peer.
    pub async fn poll(&self, timeout: Duration) -> Result<bool> {
        let Some(request) = self.replicator.transport().recv_timeout(timeout).await? else {
            return Ok(false);
        };

        match self.process(&request).await {
            Ok(Some(answer)) if !request.is_reply() => self.answer(&request, answer).await,
            Ok(_) => {}
            Err(e) => debug!(
                "Request {} from {} failed: {} (rc={})",
                request.op.map_or_else(|| "(none)".to_string(), |op| op.to_string()),
                request.src.as_deref().unwrap_or("unknown peer"),
                e,
                e.code()
            ),
        }
        Ok(true)
    }

    /// Keep processing envelopes until nothing arrives within `idle`.
    pub async fn drain(&self, idle: Duration) -> Result<usize> {
        let mut processed = 0;
        while self.poll(idle).await? {
            processed += 1;
        }
        Ok(processed)
    }

    /// Ask every peer to acknowledge this node's shutdown.
    pub async fn announce_shutdown(&self) -> Result<()> {
        Ok(self.replicator.announce_shutdown().await?)
    }

    async fn answer(&self, request: &Envelope, answer: Envelope) {
        let Some(src) = request.src.as_deref() else {
            return;
        };
        let transport = self.replicator.transport();
        let Some(peer) = transport.lookup_node(src).await else {
            warn!("Cannot answer {}: not a cluster member", src);
            return;
        };
        if let Err(e) = transport.send(Some(&peer), answer, false).await {
            warn!("Could not answer {}: {}", peer, e);
        }
    }
}
