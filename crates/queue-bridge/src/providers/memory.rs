//! In-memory queue provider for tests and local development.
//!
//! Behaves like a visibility-timeout queue:
//! - Received messages move to an in-flight set with a fresh receipt handle
//! - In-flight messages return to the queue once their visibility expires
//! - Receives with a timeout wait for a publish instead of spinning
//!
//! Queues live in an [`InMemoryBroker`]; every client created from the same
//! broker with the same queue name sees the same messages.

use crate::attributes::TypedAttribute;
use crate::client::{ConsumerClient, ProducerClient, ReceivedPayload};
use crate::error::QueueError;
use crate::message::{MessageId, ReceiptHandle};
use crate::provider::{InMemoryConfig, ProviderType, MAX_VISIBILITY_TIMEOUT_SECONDS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// A message stored in the queue with metadata
#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: String,
    attributes: HashMap<String, TypedAttribute>,
    sent_at: DateTime<Utc>,
    receive_count: u32,
}

/// A message currently being processed
struct InFlightMessage {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Default)]
struct QueueContents {
    available: VecDeque<StoredMessage>,
    /// Keyed by receipt handle
    in_flight: HashMap<String, InFlightMessage>,
}

impl QueueContents {
    /// Return in-flight messages whose visibility has lapsed
    fn release_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(entry) = self.in_flight.remove(&receipt) {
                debug!(message_id = %entry.message.message_id, "Visibility expired; message returned to queue");
                self.available.push_back(entry.message);
            }
        }
    }

    /// Earliest moment an in-flight message becomes visible again
    fn next_release(&self) -> Option<Instant> {
        self.in_flight.values().map(|entry| entry.visible_at).min()
    }
}

/// Shared state for a single named queue
#[derive(Default)]
struct QueueState {
    contents: Mutex<QueueContents>,
    published: Notify,
}

impl QueueState {
    fn lock(&self) -> MutexGuard<'_, QueueContents> {
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// InMemoryBroker
// ============================================================================

/// Registry of named in-memory queues
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    queues: Arc<Mutex<HashMap<String, Arc<QueueState>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a client for the configured queue, creating the queue if needed
    pub fn queue(&self, config: &InMemoryConfig) -> InMemoryQueue {
        let state = {
            let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(queues.entry(config.queue_name.clone()).or_default())
        };

        InMemoryQueue {
            name: config.queue_name.clone(),
            state,
            max_messages: config.max_messages.max(1) as usize,
            visibility_timeout: Duration::from_secs(config.visibility_timeout_seconds),
        }
    }

    /// Names of every queue opened so far
    pub fn queue_names(&self) -> Vec<String> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = queues.keys().cloned().collect();
        names.sort();
        names
    }
}

// ============================================================================
// InMemoryQueue
// ============================================================================

/// Client for one in-memory queue; implements both producer and consumer sides
pub struct InMemoryQueue {
    name: String,
    state: Arc<QueueState>,
    max_messages: usize,
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    /// Create a standalone queue not shared with any broker
    pub fn new(config: &InMemoryConfig) -> Self {
        InMemoryBroker::new().queue(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Messages currently visible to receivers
    pub fn visible_count(&self) -> usize {
        let mut contents = self.state.lock();
        contents.release_expired(Instant::now());
        contents.available.len()
    }

    /// Messages received but not yet deleted or expired
    pub fn in_flight_count(&self) -> usize {
        let mut contents = self.state.lock();
        contents.release_expired(Instant::now());
        contents.in_flight.len()
    }

    fn take_batch(&self) -> Vec<ReceivedPayload> {
        let now = Instant::now();
        let mut contents = self.state.lock();
        contents.release_expired(now);

        let count = self.max_messages.min(contents.available.len());
        let taken: Vec<StoredMessage> = contents.available.drain(..count).collect();
        let mut batch = Vec::with_capacity(count);

        for mut message in taken {
            message.receive_count += 1;
            let receipt = uuid::Uuid::new_v4().to_string();

            let mut payload = ReceivedPayload::new(
                message.message_id.clone(),
                message.body.clone(),
                ReceiptHandle::new(receipt.clone()),
            );
            payload.attributes = message.attributes.clone();
            payload.system_attributes.insert(
                "ApproximateReceiveCount".to_string(),
                message.receive_count.to_string(),
            );
            payload.system_attributes.insert(
                "SentTimestamp".to_string(),
                message.sent_at.timestamp_millis().to_string(),
            );

            contents.in_flight.insert(
                receipt,
                InFlightMessage {
                    message,
                    visible_at: now + self.visibility_timeout,
                },
            );
            batch.push(payload);
        }

        batch
    }

    fn next_release(&self) -> Option<Instant> {
        self.state.lock().next_release()
    }
}

#[async_trait]
impl ProducerClient for InMemoryQueue {
    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, TypedAttribute>,
    ) -> Result<(), QueueError> {
        let limit = ProviderType::InMemory.max_message_size();
        if payload.len() > limit {
            return Err(QueueError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "MessageTooLong".to_string(),
                message: format!("message body of {} bytes exceeds {} bytes", payload.len(), limit),
            });
        }

        let message_id = MessageId::new();
        {
            let mut contents = self.state.lock();
            contents.available.push_back(StoredMessage {
                message_id: message_id.clone(),
                body: payload.to_string(),
                attributes: attributes.clone(),
                sent_at: Utc::now(),
                receive_count: 0,
            });
        }
        self.state.published.notify_one();

        debug!(queue = %self.name, message_id = %message_id, "Message stored");
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}

#[async_trait]
impl ConsumerClient for InMemoryQueue {
    async fn receive_batch(&self, timeout_seconds: u32) -> Result<Vec<ReceivedPayload>, QueueError> {
        let deadline = Instant::now() + Duration::from_secs(u64::from(timeout_seconds));

        loop {
            let batch = self.take_batch();
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(batch);
            }

            let wake_at = self
                .next_release()
                .map_or(deadline, |release| release.min(deadline));

            // Woken by a publish, a visibility expiry or the deadline
            let _ = tokio::time::timeout_at(wake_at, self.state.published.notified()).await;
        }
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        let removed = self.state.lock().in_flight.remove(receipt.as_str());

        match removed {
            Some(entry) => {
                debug!(queue = %self.name, message_id = %entry.message.message_id, "Message deleted");
            }
            None => {
                debug!(queue = %self.name, receipt = %receipt, "Delete for unknown receipt ignored");
            }
        }
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt: &ReceiptHandle,
        seconds: u64,
    ) -> Result<(), QueueError> {
        if seconds > MAX_VISIBILITY_TIMEOUT_SECONDS {
            return Err(QueueError::ProviderError {
                provider: ProviderType::InMemory.to_string(),
                code: "InvalidParameterValue".to_string(),
                message: format!(
                    "visibility timeout {} exceeds {} seconds",
                    seconds, MAX_VISIBILITY_TIMEOUT_SECONDS
                ),
            });
        }

        let now = Instant::now();
        let mut contents = self.state.lock();
        contents.release_expired(now);

        match contents.in_flight.get_mut(receipt.as_str()) {
            Some(entry) => {
                entry.visible_at = now + Duration::from_secs(seconds);
                Ok(())
            }
            None => Err(QueueError::ReceiptExpired {
                receipt: receipt.to_string(),
            }),
        }
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
