//! Publish error types

use contracts::ContractError;
use thiserror::Error;

/// Reasons a device sample could not be published
#[derive(Debug, Error)]
pub enum PublishError {
    /// No schema registered for the source
    #[error("unknown source '{source_id}'")]
    UnknownSource { source_id: String },

    /// The source's schema has no patch for the type tag
    #[error("type tag '{type_tag}' is not patched for source '{source_id}'")]
    UnpatchedTypeTag { source_id: String, type_tag: String },

    /// Patched channel has no registered stream
    #[error("no stream registered for '{key}'")]
    UnregisteredChannel { key: String },

    /// Transport refused the sample
    #[error("transport error: {0}")]
    Transport(#[from] ContractError),
}
