//! Schema enumeration responder.

use tracing::warn;

use cibsync_core::{CallData, Envelope, Operation, SchemaVersion};

use crate::error::{ReplicationError, Result};
use crate::replicator::Replicator;
use crate::traits::{DocumentEngine, Host};
use crate::transport::Transport;

impl<T: Transport, E: DocumentEngine, H: Host> Replicator<T, E, H> {
    /// List every known schema newer than the version in the request.
    pub fn respond_schemas(&self, request: &Envelope) -> Result<Envelope> {
        let version = match &request.call_data {
            Some(CallData::SchemaQuery { version }) => version.as_deref(),
            _ => {
                warn!("No data specified in request");
                return Err(ReplicationError::Protocol(
                    "no data specified in request".into(),
                ));
            }
        };
        let Some(version) = version else {
            warn!("No version specified in request");
            return Err(ReplicationError::Protocol(
                "no version specified in request".into(),
            ));
        };

        let mut answer = Envelope::new(Operation::ListSchemasAfter);
        answer.is_reply_to = request.src.clone();

        // Asking for everything after the newest schema means the requester
        // is up to date.
        let latest = self.schemas.latest().map(|s| s.name());
        if latest.as_deref() == Some(version) {
            answer.call_data = Some(CallData::Schemas(Vec::new()));
            return Ok(answer);
        }

        let after = version
            .parse::<SchemaVersion>()
            .map_err(|e| ReplicationError::Protocol(e.to_string()))?;
        answer.call_data = Some(CallData::Schemas(self.schemas.bundles_after(after)));
        Ok(answer)
    }
}
