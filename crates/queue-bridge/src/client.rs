//! Client traits implemented by every provider.
//!
//! These are the thin request/response seams between the facades and a vendor
//! transport. Implementations hold no per-message state; everything that must
//! outlive a single call (heartbeat registrations) lives in the consumer.

use crate::attributes::TypedAttribute;
use crate::error::QueueError;
use crate::message::{Message, MessageId, Metadata, ReceiptHandle};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::collections::HashMap;

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

/// A message as returned by a provider, before it is exposed to callers
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPayload {
    pub message_id: MessageId,
    pub body: String,
    /// `None` when the provider returned a message without a usable receipt
    pub receipt_handle: Option<ReceiptHandle>,
    pub attributes: HashMap<String, TypedAttribute>,
    pub system_attributes: HashMap<String, String>,
}

impl ReceivedPayload {
    /// Create new payload for a delivery
    pub fn new(message_id: MessageId, body: impl Into<String>, receipt: ReceiptHandle) -> Self {
        Self {
            message_id,
            body: body.into(),
            receipt_handle: Some(receipt),
            attributes: HashMap::new(),
            system_attributes: HashMap::new(),
        }
    }

    /// Build the caller-facing message.
    ///
    /// The receipt handle is stored last so a user attribute can never shadow it.
    pub fn into_message(self) -> Message {
        let metadata = self.system_attributes.into_iter().fold(
            Metadata::new(self.message_id.clone()),
            |metadata, (key, value)| metadata.with_attribute(key, value),
        );

        let mut message = self
            .attributes
            .iter()
            .fold(Message::new(self.message_id, self.body), |message, (key, attr)| {
                message.with_attribute(key.clone(), attr.to_value())
            })
            .with_metadata(metadata);

        if let Some(receipt) = &self.receipt_handle {
            message = message.with_receipt_handle(receipt);
        }

        message
    }
}

/// Interface implemented by providers that accept published messages
#[async_trait]
pub trait ProducerClient: Send + Sync {
    /// Publish a single message; attributes are already validated
    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, TypedAttribute>,
    ) -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Check if the provider accepts message attributes
    fn supports_attributes(&self) -> bool {
        self.provider_type().supports_attributes()
    }

    /// Release transport resources. Never fails.
    async fn close(&self) {}
}

/// Interface implemented by providers that messages can be consumed from
#[async_trait]
pub trait ConsumerClient: Send + Sync {
    /// Receive up to the configured batch size, waiting at most `timeout_seconds`.
    ///
    /// A timeout of 0 performs a single poll without waiting.
    async fn receive_batch(&self, timeout_seconds: u32) -> Result<Vec<ReceivedPayload>, QueueError>;

    /// Delete a delivery. Deleting an already deleted receipt is not an error.
    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError>;

    /// Keep a delivery invisible for `seconds` from now.
    ///
    /// Fails with [`QueueError::ReceiptExpired`] once the receipt is no longer
    /// in flight.
    async fn extend_visibility(&self, receipt: &ReceiptHandle, seconds: u64)
        -> Result<(), QueueError>;

    /// Get provider type
    fn provider_type(&self) -> ProviderType;

    /// Release transport resources. Never fails.
    async fn close(&self) {}
}
