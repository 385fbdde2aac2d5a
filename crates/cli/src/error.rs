//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Address in configuration could not be parsed
    #[error("Invalid address for {field}: '{value}'")]
    InvalidAddress { field: String, value: String },

    /// Preflight command did not produce its expected response
    #[error("Preflight command '{command}' failed: {message}")]
    Preflight { command: String, message: String },

    /// Packet sink socket could not be opened
    #[error("Failed to open packet sink {addr}: {source}")]
    PacketSink {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_address(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidAddress {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn preflight(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Preflight {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn packet_sink(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::PacketSink {
            addr: addr.into(),
            source,
        }
    }
}
