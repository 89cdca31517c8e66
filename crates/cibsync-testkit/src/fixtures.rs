//! Test fixtures and helpers.
//!
//! Common setup code for replication tests.

use cibsync_core::document::attrs;
use cibsync_core::{
    CallData, Change, Diff, Document, Envelope, Operation, SchemaCatalog, SchemaDefinition,
    SchemaFile, SchemaVersion, Transaction, VersionTriple,
};
use cibsync_replication::{ReplicationConfig, Replicator, Reply, Result};

use crate::engine::ReferenceEngine;
use crate::recording::{RecordingHost, RecordingTransport};

/// Replicator wired to the recording collaborators.
pub type TestReplicator = Replicator<RecordingTransport, ReferenceEngine, RecordingHost>;

/// Name of the fixture's own node.
pub const LOCAL_NODE: &str = "node1";

/// Peers the fixture's transport knows about.
pub const PEERS: [&str; 2] = ["node2", "node3"];

/// Schema every fixture document starts on.
pub const BASE_SCHEMA: SchemaVersion = SchemaVersion::new(3, 0);

/// A whole document at `version` validating against [`BASE_SCHEMA`].
pub fn cib_at(version: VersionTriple) -> Document {
    Document::cib(version)
        .with_attr(attrs::VALIDATE_WITH, BASE_SCHEMA.name())
        .with_child(Document::new("configuration"))
        .with_child(Document::new("status"))
}

/// The document every fixture starts with.
pub fn base_document() -> Document {
    cib_at(VersionTriple::new(0, 1, 1))
}

/// Schemas 3.0 through 3.3, each including a shared rule file.
pub fn schema_catalog() -> SchemaCatalog {
    let mut catalog = SchemaCatalog::new()
        .with_include(SchemaFile::new("rule.rng", "<rule/>").including("score.rng"))
        .with_include(SchemaFile::new("score.rng", "<score/>"));
    for minor in 0..=3 {
        let version = SchemaVersion::new(3, minor);
        catalog.add_schema(SchemaDefinition {
            version,
            file: SchemaFile::new(format!("{}.rng", version.name()), "<grammar/>")
                .including("rule.rng"),
        });
    }
    catalog
}

/// A diff from `from` to the next update that sets one root attribute.
pub fn diff_from(from: VersionTriple, attr: &str, value: &str) -> Diff {
    Diff::new(from, from.next_update()).with_change(Change::SetAttribute {
        name: attr.to_string(),
        value: value.to_string(),
    })
}

/// Wrap a diff in an inbound request from `src`.
pub fn diff_request(diff: Diff, src: &str) -> Envelope {
    Envelope::new(Operation::ApplyDiff)
        .with_src(src)
        .with_call_data(CallData::Diff(diff))
}

/// Wrap a document in an inbound replace request from `src`.
pub fn replace_request(document: Document, src: &str) -> Envelope {
    Envelope::new(Operation::Replace)
        .with_src(src)
        .with_call_data(CallData::Document(document))
}

/// Wrap a transaction in a commit request from local client `client_id`.
pub fn transaction_request(changes: Vec<Change>, client_id: Option<&str>) -> Envelope {
    let mut request = Envelope::new(Operation::CommitTransaction)
        .with_call_data(CallData::Transaction(Transaction::new(changes)));
    request.client_id = client_id.map(str::to_string);
    request
}

/// A replicator plus the live document it is driving.
///
/// [`TestFixture::handle`] activates returned documents the way a node does.
pub struct TestFixture {
    pub replicator: TestReplicator,
    pub document: Option<Document>,
}

impl TestFixture {
    /// Secondary node with default config, known peers and the base document.
    pub fn new() -> Self {
        Self::build(ReplicationConfig::default(), ReferenceEngine::new(), RecordingHost::new())
    }

    pub fn with_config(config: ReplicationConfig) -> Self {
        Self::build(config, ReferenceEngine::new(), RecordingHost::new())
    }

    pub fn build(config: ReplicationConfig, engine: ReferenceEngine, host: RecordingHost) -> Self {
        let transport = RecordingTransport::new(LOCAL_NODE).with_members(PEERS);
        Self {
            replicator: Replicator::new(transport, engine, host, schema_catalog(), config),
            document: Some(base_document()),
        }
    }

    pub fn transport(&self) -> &RecordingTransport {
        self.replicator.transport()
    }

    pub fn engine(&self) -> &ReferenceEngine {
        self.replicator.engine()
    }

    pub fn host(&self) -> &RecordingHost {
        self.replicator.host()
    }

    /// Current version of the live document.
    pub fn version(&self) -> VersionTriple {
        self.document
            .as_ref()
            .map(Document::version)
            .unwrap_or_default()
    }

    /// Promote this node.
    pub async fn promote(&self) {
        let request = Envelope::new(Operation::BecomePrimary);
        // Promotion cannot fail.
        let _ = self.replicator.handle(&request, None).await;
    }

    /// Handle `request` and activate any document the reply carries.
    pub async fn handle(&mut self, request: &Envelope) -> Result<Reply> {
        let reply = self
            .replicator
            .handle(request, self.document.as_ref())
            .await?;
        if let Some(document) = &reply.document {
            self.document = Some(document.clone());
        }
        Ok(reply)
    }

    /// Handle a diff on top of the live version setting `attr`.
    pub async fn next_diff(&mut self, attr: &str, value: &str) -> Result<Reply> {
        let request = diff_request(diff_from(self.version(), attr, value), PEERS[0]);
        self.handle(&request).await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_applies_diffs() {
        let mut fixture = TestFixture::new();
        let start = fixture.version();

        fixture.next_diff("have-quorum", "1").await.unwrap();
        fixture.next_diff("have-quorum", "0").await.unwrap();

        assert_eq!(fixture.version(), start.next_update().next_update());
        assert_eq!(
            fixture.document.as_ref().unwrap().attr("have-quorum"),
            Some("0")
        );
    }

    #[tokio::test]
    async fn test_promote() {
        let fixture = TestFixture::new();
        assert!(!fixture.replicator.is_primary().await);
        fixture.promote().await;
        assert!(fixture.replicator.is_primary().await);
    }

    #[test]
    fn test_catalog_is_ordered() {
        let catalog = schema_catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.latest().unwrap().version, SchemaVersion::new(3, 3));
    }
}
