//! Cluster transport abstraction.
//!
//! The transport delivers envelopes to one peer or to every peer, and
//! fronts the cluster membership cache. Sends only enqueue: they never wait
//! for the peer to act on the message.

use async_trait::async_trait;

use cibsync_core::{Envelope, Peer};

use crate::error::ReplicationError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Transport trait for cluster messaging.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Enqueue an envelope for `peer`, or for every peer when `peer` is `None`.
    ///
    /// Must not wait on the receiver: callers send while holding the
    /// document lock.
    async fn send(&self, peer: Option<&Peer>, envelope: Envelope, expect_ack: bool) -> Result<()>;

    /// Receive the next envelope addressed to this node.
    ///
    /// The transport stamps `src` with the sender's name.
    async fn recv(&self) -> Result<Envelope>;

    /// Receive with timeout.
    ///
    /// Returns None if timeout expires before a message arrives.
    async fn recv_timeout(&self, timeout: std::time::Duration) -> Result<Option<Envelope>>;

    /// The local node's cluster name, if this node is a cluster member.
    fn local_name(&self) -> Option<String>;

    /// Resolve a node name through the membership cache.
    async fn lookup_node(&self, name: &str) -> Option<Peer>;
}

/// A simple in-memory transport for testing.
///
/// Uses channels to simulate message passing between nodes.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Inbound channel for each node, by name.
        senders: RwLock<HashMap<String, mpsc::UnboundedSender<Envelope>>>,
    }

    impl MemoryNetwork {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport for `name` connected to this network.
        pub async fn create_transport(self: &Arc<Self>, name: &str) -> MemoryTransport {
            let (tx, rx) = mpsc::unbounded_channel();

            self.senders.write().await.insert(name.to_string(), tx);

            MemoryTransport {
                name: name.to_string(),
                network: Arc::clone(self),
                receiver: RwLock::new(rx),
            }
        }

        /// Remove a node, as if it left the cluster.
        pub async fn disconnect(&self, name: &str) {
            self.senders.write().await.remove(name);
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        name: String,
        network: Arc<MemoryNetwork>,
        receiver: RwLock<mpsc::UnboundedReceiver<Envelope>>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(
            &self,
            peer: Option<&Peer>,
            envelope: Envelope,
            _expect_ack: bool,
        ) -> Result<()> {
            let envelope = envelope.with_src(self.name.clone());
            let senders = self.network.senders.read().await;

            match peer {
                Some(peer) => {
                    let sender = senders.get(&peer.uname).ok_or_else(|| {
                        ReplicationError::NotConnected(format!("peer {} not found", peer))
                    })?;
                    sender.send(envelope).map_err(|_| {
                        ReplicationError::NotConnected(format!("peer {} disconnected", peer))
                    })
                }
                None => {
                    for (name, sender) in senders.iter() {
                        if name != &self.name {
                            // Peers that went away miss the broadcast.
                            let _ = sender.send(envelope.clone());
                        }
                    }
                    Ok(())
                }
            }
        }

        async fn recv(&self) -> Result<Envelope> {
            let mut rx = self.receiver.write().await;
            rx.recv()
                .await
                .ok_or_else(|| ReplicationError::NotConnected("channel closed".into()))
        }

        async fn recv_timeout(&self, timeout: std::time::Duration) -> Result<Option<Envelope>> {
            let mut rx = self.receiver.write().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some(envelope)),
                Ok(None) => Err(ReplicationError::NotConnected("channel closed".into())),
                Err(_) => Ok(None),
            }
        }

        fn local_name(&self) -> Option<String> {
            Some(self.name.clone())
        }

        async fn lookup_node(&self, name: &str) -> Option<Peer> {
            let senders = self.network.senders.read().await;
            senders.contains_key(name).then(|| Peer::new(name))
        }
    }
}
