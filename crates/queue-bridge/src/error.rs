//! Error types for producer, consumer and configuration operations.

use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Unsupported operation: {message}")]
    UnsupportedOperation { message: String },

    #[error("Invalid message attribute: {0}")]
    Attribute(#[from] AttributeError),

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Message '{message_id}' has no receipt handle")]
    MissingReceiptHandle { message_id: String },

    #[error("Receipt handle expired or no longer in flight: {receipt}")]
    ReceiptExpired { receipt: String },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Provider error ({provider}): {code} - {message}")]
    ProviderError {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Client has been closed")]
    Closed,
}

impl QueueError {
    /// Create an unsupported-operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::UnsupportedOperation { .. } => false,
            Self::Attribute(_) => false,
            Self::Configuration(_) => false,
            Self::MissingReceiptHandle { .. } => false,
            Self::ReceiptExpired { .. } => false,
            Self::ConnectionFailed { .. } => true,
            Self::ProviderError { .. } => true, // Provider-specific errors are usually transient
            Self::Serialization(_) => false,
            Self::Closed => false,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }
}

/// Errors raised while validating or converting message attributes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("Message attribute '{key}' cannot be null")]
    InvalidAttribute { key: String },

    #[error(
        "Unsupported message attribute type for key '{key}': {type_name}. Supported types: String, Number, Boolean"
    )]
    UnsupportedType { key: String, type_name: String },
}

impl AttributeError {
    /// The attribute key that failed validation
    pub fn key(&self) -> &str {
        match self {
            Self::InvalidAttribute { key } => key,
            Self::UnsupportedType { key, .. } => key,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Unknown queue provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
