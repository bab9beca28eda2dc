//! Message types returned by consumers, including core domain identifiers.

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Attribute key under which a received message carries its receipt handle
pub const RECEIPT_HANDLE: &str = "RECEIPT_HANDLE";

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Provider-assigned message identifier.
///
/// Unique per receive; the same id can reappear when a message is redelivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque per-delivery token used to delete or extend a received message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// System-level metadata populated by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: MessageId,
    pub received_at: DateTime<Utc>,
    /// Provider system attributes (sent timestamp, receive count, ...)
    pub attributes: HashMap<String, Value>,
}

impl Metadata {
    /// Create metadata for a message received now
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            received_at: Utc::now(),
            attributes: HashMap::new(),
        }
    }

    /// Add a system attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A message received from a consumer.
///
/// Immutable once built. The receipt handle lives in `attributes` under
/// [`RECEIPT_HANDLE`] and must reach acknowledge and heartbeat calls unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    body: String,
    metadata: Metadata,
    attributes: HashMap<String, Value>,
}

impl Message {
    /// Create new message with body and provider id
    pub fn new(id: MessageId, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            metadata: Metadata::new(id),
            attributes: HashMap::new(),
        }
    }

    /// Replace the provider metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add message attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attach the delivery's receipt handle
    pub fn with_receipt_handle(self, receipt: &ReceiptHandle) -> Self {
        self.with_attribute(RECEIPT_HANDLE, receipt.as_str())
    }

    pub fn id(&self) -> &MessageId {
        &self.metadata.id
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get the receipt handle needed to acknowledge or extend this delivery
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::MissingReceiptHandle`] if the message carries no
    /// receipt handle, or carries one that is not a string.
    pub fn receipt_handle(&self) -> Result<ReceiptHandle, QueueError> {
        match self.attributes.get(RECEIPT_HANDLE) {
            Some(Value::String(handle)) if !handle.is_empty() => Ok(ReceiptHandle::new(handle)),
            _ => Err(QueueError::MissingReceiptHandle {
                message_id: self.metadata.id.to_string(),
            }),
        }
    }

    /// Deserialize the body as JSON
    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, QueueError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
