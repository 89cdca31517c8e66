//! Role arbitration, shutdown handshakes and dispatch edge cases.

mod common;

use cibsync_core::{Envelope, Operation};
use cibsync_replication::{codes, ErrorKind, ReplicationError, Reply};
use cibsync_testkit::{TestFixture, LOCAL_NODE};

#[tokio::test]
async fn test_is_primary_query() {
    common::init_tracing();
    let mut fixture = TestFixture::new();

    let err = fixture
        .handle(&Envelope::new(Operation::IsPrimary))
        .await
        .unwrap_err();
    assert_eq!(err, ReplicationError::NotPrimary);
    assert_eq!(err.code(), codes::EPERM);
    assert_eq!(err.kind(), ErrorKind::Permission);

    fixture.promote().await;
    assert!(fixture
        .handle(&Envelope::new(Operation::IsPrimary))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_promotion_is_idempotent() {
    let mut fixture = TestFixture::new();

    for _ in 0..3 {
        let reply = fixture
            .handle(&Envelope::new(Operation::BecomePrimary))
            .await
            .unwrap();
        assert_eq!(reply, Reply::empty());
        assert!(fixture.replicator.is_primary().await);
    }

    fixture
        .handle(&Envelope::new(Operation::BecomeSecondary))
        .await
        .unwrap();
    assert!(!fixture.replicator.is_primary().await);

    fixture
        .handle(&Envelope::new(Operation::BecomeSecondary))
        .await
        .unwrap();
    assert!(!fixture.replicator.is_primary().await);
}

#[tokio::test]
async fn test_role_changes_send_nothing() {
    let mut fixture = TestFixture::new();
    fixture
        .handle(&Envelope::new(Operation::BecomePrimary))
        .await
        .unwrap();
    assert!(fixture.transport().sent().is_empty());
}

#[tokio::test]
async fn test_peer_shutdown_announcement() {
    let mut fixture = TestFixture::new();
    let request = Envelope::new(Operation::ShutdownRequest).with_src("node2");

    let reply = fixture.handle(&request).await.unwrap();
    assert!(fixture.host().terminations().is_empty());

    let ack = reply.answer.unwrap();
    assert_eq!(ack.op, Some(Operation::ShutdownRequest));
    assert_eq!(ack.is_reply_to.as_deref(), Some("node2"));
    // The answer goes out through the caller, not from here.
    assert!(fixture.transport().sent().is_empty());
}

#[tokio::test]
async fn test_local_shutdown_request_needs_no_ack() {
    let mut fixture = TestFixture::new();

    let reply = fixture
        .handle(&Envelope::new(Operation::ShutdownRequest))
        .await
        .unwrap();
    assert!(reply.answer.is_none());
}

#[tokio::test]
async fn test_unsolicited_shutdown_ack() {
    common::init_tracing();
    let mut fixture = TestFixture::new();
    let mut ack = Envelope::new(Operation::ShutdownRequest).with_src("node2");
    ack.is_reply_to = Some(LOCAL_NODE.to_string());

    let err = fixture.handle(&ack).await.unwrap_err();
    assert!(matches!(err, ReplicationError::InvalidState(_)));
    assert!(fixture.host().terminations().is_empty());
}

#[tokio::test]
async fn test_shutdown_handshake() {
    let mut fixture = TestFixture::new();

    fixture.replicator.announce_shutdown().await.unwrap();
    let sent = fixture.transport().sent_with_op(Operation::ShutdownRequest);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].is_broadcast());
    assert_eq!(sent[0].envelope.delegated_from.as_deref(), Some(LOCAL_NODE));
    assert!(fixture.replicator.snapshot().await.shutdown_requested);

    let mut ack = Envelope::new(Operation::ShutdownRequest).with_src("node2");
    ack.is_reply_to = Some(LOCAL_NODE.to_string());
    let reply = fixture.handle(&ack).await.unwrap();

    assert_eq!(fixture.host().terminations().len(), 1);
    // Acknowledgments are never acknowledged.
    assert!(reply.answer.is_none());
}

#[tokio::test]
async fn test_failed_shutdown_announcement() {
    let fixture = TestFixture::new();
    fixture.transport().set_fail_sends(true);

    let err = fixture.replicator.announce_shutdown().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_noop() {
    let mut fixture = TestFixture::new();
    let before = fixture.document.clone();

    let reply = fixture.handle(&Envelope::new(Operation::Noop)).await.unwrap();
    assert_eq!(reply, Reply::empty());
    assert_eq!(fixture.document, before);
}

#[tokio::test]
async fn test_delete_absolute_is_rejected() {
    let mut fixture = TestFixture::new();
    let err = fixture
        .handle(&Envelope::new(Operation::DeleteAbsolute))
        .await
        .unwrap_err();
    assert!(matches!(err, ReplicationError::InvalidArgument(_)));
    assert_eq!(err.code(), codes::EINVAL);
}

#[tokio::test]
async fn test_request_without_operation() {
    let mut fixture = TestFixture::new();
    let err = fixture.handle(&Envelope::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(err.code(), codes::EPROTO);
}

#[test]
fn test_unknown_operation_name() {
    assert!("delete-everything".parse::<Operation>().is_err());
    assert_eq!("sync-all".parse::<Operation>().unwrap(), Operation::SyncAll);
}
