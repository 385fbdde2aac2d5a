//! Layered error definitions
//!
//! Categorized by source: document / config file / transport

use thiserror::Error;

/// Configuration document error
///
/// Raised while validating marker-input and patchboard documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required key is absent
    #[error("JSON tag not found: {tag}")]
    TagNotFound { tag: String },

    /// A value is present but not in the supported set
    #[error("value mismatch: {message}")]
    ValueMismatch { message: String },

    /// The document is structurally wrong
    #[error("incorrect JSON structure: {message}")]
    FormatIncorrect { message: String },
}

impl ConfigError {
    /// Create tag-not-found error
    pub fn tag_not_found(tag: impl Into<String>) -> Self {
        Self::TagNotFound { tag: tag.into() }
    }

    /// Create value-mismatch error
    pub fn value_mismatch(message: impl Into<String>) -> Self {
        Self::ValueMismatch {
            message: message.into(),
        }
    }

    /// Create format-incorrect error
    pub fn format_incorrect(message: impl Into<String>) -> Self {
        Self::FormatIncorrect {
            message: message.into(),
        }
    }

    /// Numeric result code of this error
    pub fn code(&self) -> ReturnCode {
        match self {
            Self::TagNotFound { .. } => ReturnCode::TagNotFound,
            Self::ValueMismatch { .. } => ReturnCode::ValueMismatch,
            Self::FormatIncorrect { .. } => ReturnCode::FormatIncorrect,
        }
    }
}

/// Result code of a registration operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum ReturnCode {
    Success = 0,
    TagNotFound = -1,
    ValueMismatch = -2,
    FormatIncorrect = -3,
}

impl ReturnCode {
    /// Map a registration result onto its code
    pub fn of<T>(result: &Result<T, ConfigError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.code(),
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Document rejected by the schema parser
    #[error("document error in '{document}': {source}")]
    Document {
        document: String,
        #[source]
        source: ConfigError,
    },

    // ===== Transport Errors =====
    /// Stream could not be created
    #[error("stream '{stream}' open error: {message}")]
    StreamOpen { stream: String, message: String },

    /// Sample could not be pushed
    #[error("stream '{stream}' push error: {message}")]
    StreamPush { stream: String, message: String },

    /// Stream is not registered with the publisher
    #[error("stream not found: {stream}")]
    StreamNotFound { stream: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Wrap a document error with the document it came from
    pub fn document(document: impl Into<String>, source: ConfigError) -> Self {
        Self::Document {
            document: document.into(),
            source,
        }
    }

    /// Create stream open error
    pub fn stream_open(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamOpen {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create stream push error
    pub fn stream_push(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamPush {
            stream: stream.into(),
            message: message.into(),
        }
    }
}
