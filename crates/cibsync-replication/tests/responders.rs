//! Full sync, ping, schema enumeration and transaction commit.

mod common;

use cibsync_core::{
    versioned_digest, CallData, Change, Envelope, Operation, SchemaBundle,
};
use cibsync_replication::{
    codes, ErrorKind, ReplicationConfig, ReplicationError, FEATURE_SET,
};
use cibsync_testkit::{
    base_document, transaction_request, RecordingHost, ReferenceEngine, TestFixture, PEERS,
};

// Full sync

fn sync_request(op: Operation, src: Option<&str>) -> Envelope {
    let mut request = Envelope::new(op);
    request.src = src.map(str::to_string);
    request.call_id = Some("5".into());
    request.client_id = Some("c-9".into());
    request.ping_id = Some("not mirrored".into());
    request
}

#[tokio::test]
async fn test_sync_to_one_replies_to_requester() {
    common::init_tracing();
    let mut fixture = TestFixture::new();
    fixture.promote().await;

    let reply = fixture
        .handle(&sync_request(Operation::SyncToOne, Some(PEERS[1])))
        .await
        .unwrap();
    assert!(reply.document.is_none());

    let sent = fixture.transport().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].peer.as_ref().map(|p| p.uname.as_str()), Some(PEERS[1]));

    let replace = &sent[0].envelope;
    assert_eq!(replace.op, Some(Operation::Replace));
    assert_eq!(replace.original_op, Some(Operation::SyncToOne));
    assert_eq!(replace.host.as_deref(), Some(PEERS[1]));
    assert_eq!(replace.is_reply_to.as_deref(), Some(PEERS[1]));
    assert_eq!(replace.global_update, Some(true));
    assert_eq!(replace.call_id.as_deref(), Some("5"));
    assert_eq!(replace.client_id.as_deref(), Some("c-9"));
    assert_eq!(replace.ping_id, None);
    assert_eq!(replace.feature_set.as_deref(), Some(FEATURE_SET));
    assert_eq!(
        replace.digest,
        Some(versioned_digest(&base_document(), FEATURE_SET))
    );
    assert_eq!(replace.document(), Some(&base_document()));
}

#[tokio::test]
async fn test_sync_all_broadcasts() {
    let mut fixture = TestFixture::new();
    fixture.promote().await;

    fixture
        .handle(&sync_request(Operation::SyncAll, Some(PEERS[0])))
        .await
        .unwrap();

    let sent = fixture.transport().sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_broadcast());
    assert_eq!(sent[0].envelope.host, None);
    assert_eq!(sent[0].envelope.original_op, Some(Operation::SyncAll));
    assert_eq!(sent[0].envelope.is_reply_to.as_deref(), Some(PEERS[0]));
}

#[tokio::test]
async fn test_sync_all_without_source() {
    let mut fixture = TestFixture::new();
    fixture.promote().await;

    fixture
        .handle(&sync_request(Operation::SyncAll, None))
        .await
        .unwrap();
    assert_eq!(fixture.transport().sent()[0].envelope.is_reply_to, None);
}

#[tokio::test]
async fn test_sync_to_one_needs_a_source() {
    let mut fixture = TestFixture::new();
    fixture.promote().await;

    let err = fixture
        .handle(&sync_request(Operation::SyncToOne, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ReplicationError::InvalidArgument(_)));
    assert!(fixture.transport().sent().is_empty());
}

#[tokio::test]
async fn test_sync_to_unknown_peer() {
    let mut fixture = TestFixture::new();
    fixture.promote().await;

    let err = fixture
        .handle(&sync_request(Operation::SyncToOne, Some("node9")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.code(), codes::ENOTCONN);
}

#[tokio::test]
async fn test_sync_without_document() {
    common::init_tracing();
    let mut fixture = TestFixture::new();
    fixture.promote().await;
    fixture.document = None;

    let err = fixture
        .handle(&sync_request(Operation::SyncAll, Some(PEERS[0])))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FatalLocal);
}

#[tokio::test]
async fn test_secondary_ignores_sync_requests() {
    let mut fixture = TestFixture::new();

    for op in [Operation::SyncToOne, Operation::SyncAll] {
        let reply = fixture.handle(&sync_request(op, Some(PEERS[1]))).await.unwrap();
        assert!(reply.document.is_none());
        assert!(reply.answer.is_none());
    }
    assert!(fixture.transport().sent().is_empty());
}

// Ping

fn ping(id: &str) -> Envelope {
    let mut request = Envelope::new(Operation::Ping).with_src(PEERS[0]);
    request.ping_id = Some(id.to_string());
    request
}

#[tokio::test]
async fn test_ping_reports_digest_with_shallow_copy() {
    common::init_tracing();
    let mut fixture = TestFixture::new();

    let reply = fixture.handle(&ping("42")).await.unwrap();
    assert!(reply.document.is_none());

    let answer = reply.answer.unwrap();
    assert_eq!(answer.op, Some(Operation::Ping));
    assert_eq!(answer.ping_id.as_deref(), Some("42"));
    assert_eq!(answer.feature_set.as_deref(), Some(FEATURE_SET));
    assert_eq!(
        answer.digest,
        Some(versioned_digest(&base_document(), FEATURE_SET))
    );
    let shallow = answer.document().unwrap();
    assert!(shallow.children.is_empty());
    assert_eq!(shallow.version(), base_document().version());
}

#[tokio::test]
async fn test_detailed_ping_embeds_document() {
    let mut fixture = TestFixture::with_config(ReplicationConfig {
        detailed_ping: true,
        ..ReplicationConfig::default()
    });

    let answer = fixture.handle(&ping("1")).await.unwrap().answer.unwrap();
    assert_eq!(answer.document(), Some(&base_document()));
}

#[tokio::test]
async fn test_ping_is_idempotent() {
    let mut fixture = TestFixture::new();
    let state = fixture.replicator.snapshot().await;

    let first = fixture.handle(&ping("7")).await.unwrap();
    let second = fixture.handle(&ping("7")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fixture.document, Some(base_document()));
    assert_eq!(fixture.replicator.snapshot().await, state);
    assert!(fixture.transport().sent().is_empty());
}

#[tokio::test]
async fn test_ping_without_document() {
    let mut fixture = TestFixture::new();
    fixture.document = None;

    let answer = fixture.handle(&ping("3")).await.unwrap().answer.unwrap();
    assert_eq!(answer.digest, None);
    assert_eq!(answer.call_data, None);
}

// Schema enumeration

fn schema_query(version: Option<&str>) -> Envelope {
    Envelope::new(Operation::ListSchemasAfter)
        .with_src(PEERS[0])
        .with_call_data(CallData::SchemaQuery {
            version: version.map(str::to_string),
        })
}

fn bundles(answer: &Envelope) -> &[SchemaBundle] {
    match &answer.call_data {
        Some(CallData::Schemas(bundles)) => bundles,
        other => panic!("unexpected payload {other:?}"),
    }
}

fn file_names(bundle: &SchemaBundle) -> Vec<&str> {
    bundle.files.iter().map(|f| f.name.as_str()).collect()
}

#[tokio::test]
async fn test_schemas_after_version() {
    let mut fixture = TestFixture::new();

    let answer = fixture
        .handle(&schema_query(Some("pacemaker-3.1")))
        .await
        .unwrap()
        .answer
        .unwrap();
    let bundles = bundles(&answer);

    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[0].version, "pacemaker-3.2");
    assert_eq!(
        file_names(&bundles[0]),
        vec!["pacemaker-3.2.rng", "rule.rng", "score.rng"]
    );
    // Includes already sent are not repeated.
    assert_eq!(bundles[1].version, "pacemaker-3.3");
    assert_eq!(file_names(&bundles[1]), vec!["pacemaker-3.3.rng"]);
}

#[tokio::test]
async fn test_bare_version_is_accepted() {
    let mut fixture = TestFixture::new();

    let answer = fixture
        .handle(&schema_query(Some("3.2")))
        .await
        .unwrap()
        .answer
        .unwrap();
    assert_eq!(bundles(&answer).len(), 1);
}

#[tokio::test]
async fn test_latest_schema_yields_empty_list() {
    let mut fixture = TestFixture::new();

    let answer = fixture
        .handle(&schema_query(Some("pacemaker-3.3")))
        .await
        .unwrap()
        .answer
        .unwrap();
    assert!(bundles(&answer).is_empty());
}

#[tokio::test]
async fn test_schema_query_protocol_errors() {
    let mut fixture = TestFixture::new();

    for request in [
        schema_query(None),
        schema_query(Some("pacemaker-next")),
        Envelope::new(Operation::ListSchemasAfter),
    ] {
        let err = fixture.handle(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}

// Transactions

fn set(name: &str, value: &str) -> Change {
    Change::SetAttribute {
        name: name.into(),
        value: value.into(),
    }
}

fn remove_child(name: &str) -> Change {
    Change::RemoveChild { name: name.into() }
}

fn fixture_with_client() -> TestFixture {
    TestFixture::build(
        ReplicationConfig::default(),
        ReferenceEngine::new(),
        RecordingHost::new().with_client("c-17", "cibadmin"),
    )
}

#[tokio::test]
async fn test_transaction_commits_atomically() {
    let mut fixture = fixture_with_client();
    let start = fixture.version();

    let reply = fixture
        .handle(&transaction_request(
            vec![set("have-quorum", "1"), remove_child("status")],
            Some("c-17"),
        ))
        .await
        .unwrap();

    let doc = reply.document.unwrap();
    assert_eq!(doc.attr("have-quorum"), Some("1"));
    assert!(doc.child("status").is_none());
    assert_eq!(doc.version(), start.next_update());
}

#[tokio::test]
async fn test_failed_transaction_names_client() {
    common::init_tracing();
    let mut fixture = fixture_with_client();
    let before = fixture.document.clone();

    let err = fixture
        .handle(&transaction_request(
            vec![set("have-quorum", "1"), remove_child("nodes")],
            Some("c-17"),
        ))
        .await
        .unwrap_err();

    match &err {
        ReplicationError::Transaction { origin, .. } => {
            assert_eq!(origin, "client cibadmin (c-17)");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(fixture.document, before);
}

#[tokio::test]
async fn test_failed_transaction_from_peer() {
    let mut fixture = fixture_with_client();
    let request = transaction_request(vec![remove_child("nodes")], Some("c-unknown"))
        .with_src(PEERS[1]);

    let err = fixture.handle(&request).await.unwrap_err();
    assert!(matches!(
        err,
        ReplicationError::Transaction { ref origin, .. } if origin == "peer node3"
    ));
}

#[tokio::test]
async fn test_transaction_without_payload() {
    let mut fixture = TestFixture::new();
    let err = fixture
        .handle(&Envelope::new(Operation::CommitTransaction))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}
