//! Bridge error types

use contracts::{ConfigError, ContractError, ReturnCode};
use marker_input::MarkerInputError;
use thiserror::Error;

/// Bridge-level errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration document rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport refused a stream operation
    #[error("transport error: {0}")]
    Transport(#[from] ContractError),

    /// Marker receiver could not start
    #[error("marker receiver error: {0}")]
    MarkerReceiver(#[from] MarkerInputError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Document error, when the failure came from the schema parser
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }

    /// Return code of a document error
    pub fn return_code(&self) -> Option<ReturnCode> {
        self.config_error().map(ConfigError::code)
    }
}
