//! Provider-agnostic message producer.

use crate::attributes::{self, Attributes};
use crate::client::ProducerClient;
use crate::error::QueueError;
use crate::provider::ProviderType;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;

/// Error message for attribute sends on providers without attribute support
pub const ATTRIBUTES_UNSUPPORTED: &str = "Message attributes are not supported by this provider";

/// Interface for sending messages to a queue or topic
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Send a message body without attributes
    async fn send(&self, payload: &str) -> Result<(), QueueError>;

    /// Send a message body with attributes.
    ///
    /// Producers that cannot carry attributes keep this default and fail
    /// without sending anything, even for an empty map.
    async fn send_with_attributes(
        &self,
        _payload: &str,
        _attributes: &Attributes,
    ) -> Result<(), QueueError> {
        Err(QueueError::unsupported(ATTRIBUTES_UNSUPPORTED))
    }

    /// Check if `send_with_attributes` is available
    fn supports_attributes(&self) -> bool {
        false
    }

    /// Release resources. Safe to call more than once.
    async fn close(&self);
}

/// Producer facade over a provider client
pub struct QueueProducer<C: ProducerClient> {
    client: C,
    closed: AtomicBool,
}

impl<C: ProducerClient> QueueProducer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn provider_type(&self) -> ProviderType {
        self.client.provider_type()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Serialize `value` as JSON and send it as the message body
    pub async fn send_json<T>(&self, value: &T) -> Result<(), QueueError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let payload = serde_json::to_string(value)?;
        self.send(&payload).await
    }

    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, attributes::TypedAttribute>,
    ) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        self.client.publish(payload, attributes).await?;

        debug!(
            provider = %self.provider_type(),
            attribute_count = attributes.len(),
            "Message sent"
        );
        Ok(())
    }
}

#[async_trait]
impl<C: ProducerClient> MessageProducer for QueueProducer<C> {
    async fn send(&self, payload: &str) -> Result<(), QueueError> {
        self.publish(payload, &HashMap::new()).await
    }

    async fn send_with_attributes(
        &self,
        payload: &str,
        attributes: &Attributes,
    ) -> Result<(), QueueError> {
        if !self.supports_attributes() {
            return Err(QueueError::unsupported(ATTRIBUTES_UNSUPPORTED));
        }

        if attributes.is_empty() {
            return self.send(payload).await;
        }

        let converted = attributes::convert(Some(attributes))?;
        self.publish(payload, &converted).await
    }

    fn supports_attributes(&self) -> bool {
        self.client.supports_attributes()
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        self.client.close().await;
        info!(provider = %self.provider_type(), "Producer closed");
    }
}
