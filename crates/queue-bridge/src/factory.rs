//! Construction of producers and consumers from configuration.
//!
//! The factory turns a [`QueueConfig`] into a [`Producer`] or [`Consumer`],
//! closed enums over every provider implementation. Capability checks run
//! before any client is built, so asking for an SNS consumer fails without
//! touching AWS.

use crate::attributes::Attributes;
use crate::consumer::{MessageConsumer, QueueConsumer};
use crate::error::QueueError;
use crate::message::Message;
use crate::producer::{MessageProducer, QueueProducer};
use crate::provider::{ProviderType, QueueConfig};
use crate::providers::{InMemoryBroker, InMemoryQueue, SnsClient, SqsClient};
use async_trait::async_trait;
use tracing::info;

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;

pub type SqsProducer = QueueProducer<SqsClient>;
pub type SnsProducer = QueueProducer<SnsClient>;
pub type InMemoryProducer = QueueProducer<InMemoryQueue>;
pub type SqsConsumer = QueueConsumer<SqsClient>;
pub type InMemoryConsumer = QueueConsumer<InMemoryQueue>;

// ============================================================================
// Producer
// ============================================================================

/// Producer for any supported provider
pub enum Producer {
    Sqs(SqsProducer),
    Sns(SnsProducer),
    InMemory(InMemoryProducer),
}

impl Producer {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Sqs(_) => ProviderType::Sqs,
            Self::Sns(_) => ProviderType::Sns,
            Self::InMemory(_) => ProviderType::InMemory,
        }
    }

    /// Serialize `value` as JSON and send it
    pub async fn send_json<T>(&self, value: &T) -> Result<(), QueueError>
    where
        T: serde::Serialize + Sync + ?Sized,
    {
        match self {
            Self::Sqs(producer) => producer.send_json(value).await,
            Self::Sns(producer) => producer.send_json(value).await,
            Self::InMemory(producer) => producer.send_json(value).await,
        }
    }
}

#[async_trait]
impl MessageProducer for Producer {
    async fn send(&self, payload: &str) -> Result<(), QueueError> {
        match self {
            Self::Sqs(producer) => producer.send(payload).await,
            Self::Sns(producer) => producer.send(payload).await,
            Self::InMemory(producer) => producer.send(payload).await,
        }
    }

    async fn send_with_attributes(
        &self,
        payload: &str,
        attributes: &Attributes,
    ) -> Result<(), QueueError> {
        match self {
            Self::Sqs(producer) => producer.send_with_attributes(payload, attributes).await,
            Self::Sns(producer) => producer.send_with_attributes(payload, attributes).await,
            Self::InMemory(producer) => producer.send_with_attributes(payload, attributes).await,
        }
    }

    fn supports_attributes(&self) -> bool {
        match self {
            Self::Sqs(producer) => producer.supports_attributes(),
            Self::Sns(producer) => producer.supports_attributes(),
            Self::InMemory(producer) => producer.supports_attributes(),
        }
    }

    async fn close(&self) {
        match self {
            Self::Sqs(producer) => producer.close().await,
            Self::Sns(producer) => producer.close().await,
            Self::InMemory(producer) => producer.close().await,
        }
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// Consumer for any provider that supports consumption
pub enum Consumer {
    Sqs(SqsConsumer),
    InMemory(InMemoryConsumer),
}

impl Consumer {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            Self::Sqs(_) => ProviderType::Sqs,
            Self::InMemory(_) => ProviderType::InMemory,
        }
    }

    /// Number of messages currently being renewed
    pub fn in_flight(&self) -> usize {
        match self {
            Self::Sqs(consumer) => consumer.in_flight(),
            Self::InMemory(consumer) => consumer.in_flight(),
        }
    }
}

#[async_trait]
impl MessageConsumer for Consumer {
    async fn receive_with_timeout(&self, timeout_seconds: u32) -> Result<Vec<Message>, QueueError> {
        match self {
            Self::Sqs(consumer) => consumer.receive_with_timeout(timeout_seconds).await,
            Self::InMemory(consumer) => consumer.receive_with_timeout(timeout_seconds).await,
        }
    }

    async fn acknowledge(&self, message: &Message) -> Result<(), QueueError> {
        match self {
            Self::Sqs(consumer) => consumer.acknowledge(message).await,
            Self::InMemory(consumer) => consumer.acknowledge(message).await,
        }
    }

    async fn send_heartbeat(&self, message: &Message) -> Result<(), QueueError> {
        match self {
            Self::Sqs(consumer) => consumer.send_heartbeat(message).await,
            Self::InMemory(consumer) => consumer.send_heartbeat(message).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Sqs(consumer) => consumer.close().await,
            Self::InMemory(consumer) => consumer.close().await,
        }
    }
}

// ============================================================================
// QueueClientFactory
// ============================================================================

/// Factory for creating producers and consumers.
///
/// In-memory queues are shared between every producer and consumer created
/// by the same factory, keyed by queue name.
///
/// ```rust
/// use queue_bridge::{
///     InMemoryConfig, MessageConsumer, MessageProducer, QueueClientFactory, QueueConfig,
/// };
///
/// # tokio_test::block_on(async {
/// let factory = QueueClientFactory::new();
/// let config = QueueConfig::InMemory(InMemoryConfig::default().with_queue_name("orders"));
///
/// let producer = factory.create_producer(&config).await.unwrap();
/// let consumer = factory.create_consumer(&config).await.unwrap();
///
/// producer.send("hello").await.unwrap();
/// let messages = consumer.receive().await.unwrap();
/// assert_eq!(messages[0].body(), "hello");
///
/// consumer.acknowledge(&messages[0]).await.unwrap();
/// consumer.close().await;
/// # });
/// ```
#[derive(Clone, Default)]
pub struct QueueClientFactory {
    broker: InMemoryBroker,
}

impl QueueClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker backing in-memory producers and consumers
    pub fn broker(&self) -> &InMemoryBroker {
        &self.broker
    }

    /// Create a producer for the configured provider
    pub async fn create_producer(&self, config: &QueueConfig) -> Result<Producer, QueueError> {
        config.validate()?;

        let producer = match config {
            QueueConfig::Sqs(sqs) => {
                Producer::Sqs(QueueProducer::new(SqsClient::connect(sqs).await?))
            }
            QueueConfig::Sns(sns) => {
                Producer::Sns(QueueProducer::new(SnsClient::connect(sns).await?))
            }
            QueueConfig::InMemory(memory) => {
                Producer::InMemory(QueueProducer::new(self.broker.queue(memory)))
            }
        };

        info!(provider = %config.provider(), "Created producer");
        Ok(producer)
    }

    /// Create a consumer for the configured provider.
    ///
    /// Fails with [`QueueError::UnsupportedOperation`] for publish-only
    /// providers before any client is constructed.
    pub async fn create_consumer(&self, config: &QueueConfig) -> Result<Consumer, QueueError> {
        let provider = config.provider();
        if !provider.supports_consumption() {
            return Err(consumption_unsupported(provider));
        }

        config.validate()?;

        let consumer = match config {
            QueueConfig::Sqs(sqs) => Consumer::Sqs(QueueConsumer::new(
                SqsClient::connect(sqs).await?,
                sqs.heartbeat.clone(),
            )),
            QueueConfig::InMemory(memory) => Consumer::InMemory(QueueConsumer::new(
                self.broker.queue(memory),
                memory.heartbeat.clone(),
            )),
            QueueConfig::Sns(_) => return Err(consumption_unsupported(provider)),
        };

        info!(provider = %provider, "Created consumer");
        Ok(consumer)
    }
}

fn consumption_unsupported(provider: ProviderType) -> QueueError {
    QueueError::unsupported(
        provider
            .consumption_unsupported_reason()
            .unwrap_or("Provider does not support consuming messages"),
    )
}
