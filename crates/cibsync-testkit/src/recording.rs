//! Recording collaborators: a transport that captures every send and a
//! host that captures terminations.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use cibsync_core::{Envelope, Operation, Peer};
use cibsync_replication::{Client, Host, ReplicationError, Transport};

/// One captured send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// `None` for a broadcast.
    pub peer: Option<Peer>,
    pub envelope: Envelope,
    pub expect_ack: bool,
}

impl Sent {
    pub fn is_broadcast(&self) -> bool {
        self.peer.is_none()
    }

    pub fn op(&self) -> Option<Operation> {
        self.envelope.op
    }
}

/// Transport that records outbound envelopes instead of delivering them.
///
/// Membership is a fixed set of names the test controls. Inbound envelopes
/// are queued by the test with [`RecordingTransport::push_inbound`].
#[derive(Debug, Default)]
pub struct RecordingTransport {
    local: Option<String>,
    members: Mutex<BTreeSet<String>>,
    sent: Mutex<Vec<Sent>>,
    inbox: Mutex<VecDeque<Envelope>>,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    /// A cluster member called `local`.
    pub fn new(local: &str) -> Self {
        Self {
            local: Some(local.to_string()),
            ..Self::default()
        }
    }

    /// A node outside any cluster.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn with_members<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        lock(&self.members).extend(names.into_iter().map(str::to_string));
        self
    }

    pub fn add_member(&self, name: &str) {
        lock(&self.members).insert(name.to_string());
    }

    pub fn remove_member(&self, name: &str) {
        lock(&self.members).remove(name);
    }

    /// Make every subsequent send fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn push_inbound(&self, envelope: Envelope) {
        lock(&self.inbox).push_back(envelope);
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        lock(&self.sent).clone()
    }

    /// Drain everything sent so far.
    pub fn take_sent(&self) -> Vec<Sent> {
        std::mem::take(&mut *lock(&self.sent))
    }

    /// Sends of `op` only.
    pub fn sent_with_op(&self, op: Operation) -> Vec<Sent> {
        lock(&self.sent)
            .iter()
            .filter(|s| s.op() == Some(op))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        peer: Option<&Peer>,
        envelope: Envelope,
        expect_ack: bool,
    ) -> Result<(), ReplicationError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ReplicationError::NotConnected("send failed".into()));
        }
        if let Some(peer) = peer {
            if !lock(&self.members).contains(&peer.uname) {
                return Err(ReplicationError::NotConnected(format!(
                    "peer {peer} not found"
                )));
            }
        }

        let envelope = match &self.local {
            Some(local) => envelope.with_src(local.clone()),
            None => envelope,
        };
        lock(&self.sent).push(Sent {
            peer: peer.cloned(),
            envelope,
            expect_ack,
        });
        Ok(())
    }

    async fn recv(&self) -> Result<Envelope, ReplicationError> {
        lock(&self.inbox)
            .pop_front()
            .ok_or_else(|| ReplicationError::NotConnected("no queued messages".into()))
    }

    async fn recv_timeout(&self, _timeout: Duration) -> Result<Option<Envelope>, ReplicationError> {
        Ok(lock(&self.inbox).pop_front())
    }

    fn local_name(&self) -> Option<String> {
        self.local.clone()
    }

    async fn lookup_node(&self, name: &str) -> Option<Peer> {
        lock(&self.members).contains(name).then(|| Peer::new(name))
    }
}

/// Host with a fixed client registry that records terminations.
#[derive(Debug, Default)]
pub struct RecordingHost {
    clients: HashMap<String, Client>,
    terminations: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, id: &str, name: &str) -> Self {
        self.clients
            .insert(id.to_string(), Client::new(id, Some(name.to_string())));
        self
    }

    /// Reasons passed to every `terminate` call so far.
    pub fn terminations(&self) -> Vec<String> {
        lock(&self.terminations).clone()
    }
}

impl Host for RecordingHost {
    fn find_client(&self, id: &str) -> Option<Client> {
        self.clients.get(id).cloned()
    }

    fn terminate(&self, reason: &str) {
        lock(&self.terminations).push(reason.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_stamps_source() {
        let transport = RecordingTransport::new("node1").with_members(["node2"]);
        let peer = transport.lookup_node("node2").await.unwrap();

        transport
            .send(Some(&peer), Envelope::new(Operation::Ping), true)
            .await
            .unwrap();
        transport
            .send(None, Envelope::new(Operation::Noop), false)
            .await
            .unwrap();

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].envelope.src.as_deref(), Some("node1"));
        assert!(sent[0].expect_ack);
        assert!(sent[1].is_broadcast());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_peer_and_forced_failure() {
        let transport = RecordingTransport::new("node1");
        assert!(transport.lookup_node("node9").await.is_none());

        let ghost = Peer::new("node9");
        assert!(transport
            .send(Some(&ghost), Envelope::new(Operation::Ping), false)
            .await
            .is_err());

        transport.set_fail_sends(true);
        assert!(transport
            .send(None, Envelope::new(Operation::Ping), false)
            .await
            .is_err());
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_host_records_terminations() {
        let host = RecordingHost::new().with_client("c-1", "crmd");
        assert_eq!(host.find_client("c-1").unwrap().name.as_deref(), Some("crmd"));
        assert!(host.find_client("c-2").is_none());

        host.terminate("bye");
        assert_eq!(host.terminations(), vec!["bye".to_string()]);
    }
}
