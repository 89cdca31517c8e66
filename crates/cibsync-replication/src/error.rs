//! Error types for the replication core.

use thiserror::Error;

use cibsync_core::VersionTriple;

/// Legacy numeric result codes, as carried on the wire.
pub mod codes {
    pub const OK: i32 = 0;
    pub const EPERM: i32 = -1;
    pub const EINVAL: i32 = -22;
    pub const EPROTO: i32 = -71;
    pub const ENOTCONN: i32 = -107;
    pub const GENERIC: i32 = -201;
    pub const SCHEMA_VALIDATION: i32 = -203;
    pub const TRANSFORM_FAILED: i32 = -204;
    pub const OLD_DATA: i32 = -205;
    pub const DIFF_FAILED: i32 = -206;
    pub const DIFF_RESYNC: i32 = -207;
    pub const SCHEMA_UNCHANGED: i32 = -211;
}

/// Failures reported by the external document engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The diff does not apply to our version; a full copy is needed.
    #[error("diff requires a full resync: {0}")]
    DiffResync(String),

    #[error("diff failed: {0}")]
    DiffFailed(String),

    #[error("update is older than the current document")]
    OldData,

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("schema transform failed: {0}")]
    TransformFailed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

impl EngineError {
    pub fn code(&self) -> i32 {
        match self {
            EngineError::DiffResync(_) => codes::DIFF_RESYNC,
            EngineError::DiffFailed(_) => codes::DIFF_FAILED,
            EngineError::OldData => codes::OLD_DATA,
            EngineError::SchemaValidation(_) => codes::SCHEMA_VALIDATION,
            EngineError::TransformFailed(_) => codes::TRANSFORM_FAILED,
            EngineError::InvalidArgument(_) => codes::EINVAL,
            EngineError::Rejected(_) => codes::GENERIC,
        }
    }
}

/// Broad class of a failure, used to decide how it propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Role mismatch.
    Permission,
    /// Missing or malformed request fields.
    Protocol,
    /// The request conflicts with current state.
    StateConflict,
    /// A message could not be enqueued.
    Transport,
    /// A local invariant does not hold.
    FatalLocal,
}

/// Errors returned by request handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    #[error("this node is not the primary")]
    NotPrimary,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    /// A diff arrived while a full resync is outstanding.
    #[error("diff {from} -> {to} not applied: resync in progress")]
    ResyncPending { from: VersionTriple, to: VersionTriple },

    #[error("document engine: {0}")]
    Engine(#[from] EngineError),

    #[error("schema unchanged")]
    SchemaUnchanged,

    #[error("transaction from {origin} failed: {reason}")]
    Transaction { origin: String, reason: EngineError },

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("no current document")]
    MissingDocument,
}

impl ReplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReplicationError::NotPrimary => ErrorKind::Permission,
            ReplicationError::InvalidArgument(_)
            | ReplicationError::Protocol(_) => ErrorKind::Protocol,
            ReplicationError::InvalidState(_)
            | ReplicationError::ResyncPending { .. }
            | ReplicationError::Engine(_)
            | ReplicationError::SchemaUnchanged
            | ReplicationError::Transaction { .. } => ErrorKind::StateConflict,
            ReplicationError::NotConnected(_) => ErrorKind::Transport,
            ReplicationError::MissingDocument => ErrorKind::FatalLocal,
        }
    }

    /// Numeric wire code for this error.
    pub fn code(&self) -> i32 {
        match self {
            ReplicationError::NotPrimary => codes::EPERM,
            ReplicationError::InvalidArgument(_)
            | ReplicationError::InvalidState(_)
            | ReplicationError::MissingDocument => codes::EINVAL,
            ReplicationError::Protocol(_) => codes::EPROTO,
            ReplicationError::ResyncPending { .. } => codes::DIFF_RESYNC,
            ReplicationError::Engine(e) => e.code(),
            ReplicationError::Transaction { reason, .. } => reason.code(),
            ReplicationError::SchemaUnchanged => codes::SCHEMA_UNCHANGED,
            ReplicationError::NotConnected(_) => codes::ENOTCONN,
        }
    }

    /// Whether this error means the document needs a full copy from a peer.
    pub fn needs_resync(&self) -> bool {
        matches!(
            self,
            ReplicationError::ResyncPending { .. }
                | ReplicationError::Engine(EngineError::DiffResync(_))
        )
    }
}

/// Result type for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;
