//! Provider-agnostic message consumer with automatic visibility heartbeats.
//!
//! When the configured heartbeat interval `H` is non-zero every received
//! message is renewed to `2 × H` seconds of visibility every `H` seconds until
//! it is acknowledged or the consumer is closed. See [`crate::heartbeat`].

use crate::client::ConsumerClient;
use crate::error::QueueError;
use crate::heartbeat::HeartbeatScheduler;
use crate::message::Message;
use crate::provider::{HeartbeatConfig, ProviderType};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;

/// Interface for receiving and acknowledging messages
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Poll once without waiting
    async fn receive(&self) -> Result<Vec<Message>, QueueError> {
        self.receive_with_timeout(0).await
    }

    /// Receive a batch, waiting up to `timeout_seconds` for messages to arrive
    async fn receive_with_timeout(&self, timeout_seconds: u32) -> Result<Vec<Message>, QueueError>;

    /// Delete a processed message and stop renewing it.
    ///
    /// Renewal stops only for the delivery this message came from. If the
    /// same message id has since been received again, acknowledging the older
    /// delivery leaves the newer delivery's renewal running.
    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError>;

    /// Extend a message's visibility once, outside the automatic schedule
    async fn send_heartbeat(&self, message: &Message) -> Result<(), QueueError>;

    /// Cancel all renewals and release the client. Safe to call more than once.
    async fn close(&self);
}

/// Consumer facade over a provider client
pub struct QueueConsumer<C: ConsumerClient + 'static> {
    client: Arc<C>,
    heartbeat: HeartbeatScheduler<C>,
    closed: AtomicBool,
}

impl<C: ConsumerClient + 'static> QueueConsumer<C> {
    pub fn new(client: C, heartbeat: HeartbeatConfig) -> Self {
        Self::from_shared(Arc::new(client), heartbeat)
    }

    /// Create a consumer over a client that is also used elsewhere
    pub fn from_shared(client: Arc<C>, heartbeat: HeartbeatConfig) -> Self {
        Self {
            heartbeat: HeartbeatScheduler::new(Arc::clone(&client), heartbeat),
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

    pub fn heartbeat_config(&self) -> &HeartbeatConfig {
        self.heartbeat.config()
    }

    /// Number of messages currently being renewed
    pub fn in_flight(&self) -> usize {
        self.heartbeat.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.is_closed() {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<C: ConsumerClient + 'static> MessageConsumer for QueueConsumer<C> {
    async fn receive_with_timeout(&self, timeout_seconds: u32) -> Result<Vec<Message>, QueueError> {
        self.ensure_open()?;

        let batch = self.client.receive_batch(timeout_seconds).await?;
        let renew = self.heartbeat.is_enabled();

        let mut messages = Vec::with_capacity(batch.len());
        for payload in batch {
            if renew {
                match &payload.receipt_handle {
                    Some(receipt) => {
                        self.heartbeat
                            .register(payload.message_id.clone(), receipt.clone());
                    }
                    None => {
                        warn!(
                            message_id = %payload.message_id,
                            "Message has no receipt handle; heartbeat not scheduled"
                        );
                    }
                }
            }
            messages.push(payload.into_message());
        }

        debug!(
            provider = %self.provider_type(),
            count = messages.len(),
            "Received messages"
        );
        Ok(messages)
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError> {
        self.ensure_open()?;

        let receipt = message.receipt_handle()?;
        self.client.delete(&receipt).await?;
        self.heartbeat.cancel(message.id(), &receipt);

        debug!(message_id = %message.id(), "Message acknowledged");
        Ok(())
    }

    async fn send_heartbeat(&self, message: &Message) -> Result<(), QueueError> {
        self.ensure_open()?;

        let receipt = message.receipt_handle()?;
        self.client
            .extend_visibility(&receipt, self.heartbeat.config().visibility_extension_seconds())
            .await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let cancelled = self.heartbeat.shutdown();
        self.client.close().await;

        info!(
            provider = %self.provider_type(),
            cancelled_heartbeats = cancelled,
            "Consumer closed"
        );
    }
}
