//! Error types for cibsync core.

use thiserror::Error;

/// Errors raised while interpreting core data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid version attribute {name}={value:?}")]
    InvalidVersion { name: &'static str, value: String },

    #[error("invalid schema name: {0}")]
    InvalidSchemaName(String),
}
