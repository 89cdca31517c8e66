//! Protocol message envelopes.
//!
//! An envelope is a set of named, optional fields plus an optional embedded
//! payload. Outbound messages that answer or relay a request start from
//! [`Envelope::mirror`], which copies a fixed subset of the request's
//! fields and nothing else.

use serde::{Deserialize, Serialize};

use crate::diff::{Diff, Transaction};
use crate::digest::Digest;
use crate::document::Document;
use crate::operation::Operation;
use crate::schema::SchemaBundle;
use crate::types::CallOptions;

/// Message type of every envelope handled by the replication core.
pub const T_CIB: &str = "cib";

/// Payload embedded in an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallData {
    /// A whole document, a section of one, or a shallow copy of the root.
    Document(Document),
    Diff(Diff),
    Transaction(Transaction),
    /// Request for every schema newer than `version`.
    SchemaQuery { version: Option<String> },
    /// Reply to a schema query.
    Schemas(Vec<SchemaBundle>),
}

/// A protocol message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    // Fields copied by `mirror`.
    pub msg_type: Option<String>,
    pub client_id: Option<String>,
    pub call_options: Option<CallOptions>,
    pub call_id: Option<String>,
    pub op: Option<Operation>,
    pub is_reply_to: Option<String>,
    pub section: Option<String>,
    /// Destination host.
    pub host: Option<String>,
    pub rc: Option<i32>,
    pub delegated_from: Option<String>,
    pub object: Option<String>,
    pub object_type: Option<String>,
    pub timeout: Option<u32>,
    pub global_update: Option<bool>,
    pub client_name: Option<String>,
    pub user: Option<String>,
    pub notify_type: Option<String>,
    pub notify_activate: Option<bool>,

    // Fields never copied.
    /// Sending node, stamped by the transport on delivery.
    pub src: Option<String>,
    /// Operation of the request that caused this message.
    pub original_op: Option<Operation>,
    pub feature_set: Option<String>,
    pub digest: Option<Digest>,
    /// Schema an upgrade must reach; present only on verified upgrades.
    pub schema_max: Option<String>,
    /// Result of an upgrade, relayed back to its originator.
    pub upgrade_rc: Option<i32>,
    pub ping_id: Option<String>,
    pub call_data: Option<CallData>,
}

impl Envelope {
    /// A fresh replication-core message for `op`.
    pub fn new(op: Operation) -> Self {
        Self {
            msg_type: Some(T_CIB.to_string()),
            op: Some(op),
            ..Self::default()
        }
    }

    /// Copy the mirrored field subset into a new envelope.
    pub fn mirror(&self) -> Self {
        Self {
            msg_type: self.msg_type.clone(),
            client_id: self.client_id.clone(),
            call_options: self.call_options,
            call_id: self.call_id.clone(),
            op: self.op,
            is_reply_to: self.is_reply_to.clone(),
            section: self.section.clone(),
            host: self.host.clone(),
            rc: self.rc,
            delegated_from: self.delegated_from.clone(),
            object: self.object.clone(),
            object_type: self.object_type.clone(),
            timeout: self.timeout,
            global_update: self.global_update,
            client_name: self.client_name.clone(),
            user: self.user.clone(),
            notify_type: self.notify_type.clone(),
            notify_activate: self.notify_activate,
            ..Self::default()
        }
    }

    pub fn options(&self) -> CallOptions {
        self.call_options.unwrap_or_default()
    }

    /// Whether this message answers an earlier request.
    pub fn is_reply(&self) -> bool {
        self.is_reply_to.is_some()
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.call_data {
            Some(CallData::Document(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn diff(&self) -> Option<&Diff> {
        match &self.call_data {
            Some(CallData::Diff(diff)) => Some(diff),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match &self.call_data {
            Some(CallData::Transaction(tx)) => Some(tx),
            _ => None,
        }
    }

    pub fn with_call_data(mut self, data: CallData) -> Self {
        self.call_data = Some(data);
        self
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VersionTriple;

    fn full_request() -> Envelope {
        Envelope {
            msg_type: Some(T_CIB.into()),
            client_id: Some("client-1".into()),
            call_options: Some(CallOptions::FORCE_DIFF),
            call_id: Some("17".into()),
            op: Some(Operation::SyncToOne),
            is_reply_to: Some("node1".into()),
            section: Some("configuration".into()),
            host: Some("node2".into()),
            rc: Some(0),
            delegated_from: Some("node3".into()),
            object: Some("obj".into()),
            object_type: Some("primitive".into()),
            timeout: Some(30),
            global_update: Some(false),
            client_name: Some("cibadmin".into()),
            user: Some("hacluster".into()),
            notify_type: Some("diff".into()),
            notify_activate: Some(true),
            src: Some("node1".into()),
            original_op: Some(Operation::Ping),
            feature_set: Some("3.19.0".into()),
            digest: Some(Digest::from_bytes([1; 32])),
            schema_max: Some("pacemaker-3.10".into()),
            upgrade_rc: Some(-211),
            ping_id: Some("4".into()),
            call_data: Some(CallData::Document(Document::cib(VersionTriple::new(0, 1, 1)))),
        }
    }

    #[test]
    fn test_mirror_copies_only_the_mirrored_subset() {
        let request = full_request();
        let copy = request.mirror();

        assert_eq!(copy.client_id, request.client_id);
        assert_eq!(copy.call_options, request.call_options);
        assert_eq!(copy.host, request.host);
        assert_eq!(copy.notify_activate, request.notify_activate);

        assert_eq!(copy.src, None);
        assert_eq!(copy.original_op, None);
        assert_eq!(copy.feature_set, None);
        assert_eq!(copy.digest, None);
        assert_eq!(copy.schema_max, None);
        assert_eq!(copy.upgrade_rc, None);
        assert_eq!(copy.ping_id, None);
        assert_eq!(copy.call_data, None);
    }

    #[test]
    fn test_mirror_of_sparse_request_stays_sparse() {
        let request = Envelope::new(Operation::Ping);
        assert_eq!(request.mirror(), request);
    }

    #[test]
    fn test_payload_accessors() {
        let request = full_request();
        assert!(request.document().is_some());
        assert!(request.diff().is_none());
        assert!(request.is_reply());
        assert!(request.options().contains(CallOptions::FORCE_DIFF));
    }
}
