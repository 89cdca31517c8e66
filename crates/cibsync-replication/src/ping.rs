//! Ping responder: liveness plus the current digest.

use tracing::{info, Level};

use cibsync_core::{versioned_digest, CallData, Document, Envelope, Operation};

use crate::replicator::Replicator;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// Build a ping answer. Never changes any state.
    ///
    /// The answer always carries the root attributes so the requester can
    /// compare version triples; the whole document is included only when
    /// detailed diagnostics are on.
    pub fn respond_to_ping(&self, request: &Envelope, current: Option<&Document>) -> Envelope {
        let feature_set = &self.config.feature_set;
        let digest = current.map(|doc| versioned_digest(doc, feature_set));

        let mut answer = Envelope::new(Operation::Ping);
        answer.feature_set = Some(feature_set.clone());
        answer.digest = digest;
        answer.ping_id = request.ping_id.clone();
        answer.is_reply_to = request.src.clone();

        let detailed = self.config.detailed_ping || tracing::enabled!(Level::TRACE);
        answer.call_data = current.map(|doc| {
            CallData::Document(if detailed {
                doc.clone()
            } else {
                doc.shallow_copy()
            })
        });

        info!(
            "Reporting our current digest to {}: {} for {}",
            request.src.as_deref().unwrap_or("local client"),
            digest.map_or_else(|| "none".to_string(), |d| d.to_hex()),
            current.map_or_else(|| "no document".to_string(), |d| d.version().to_string())
        );

        answer
    }
}
