//! # Queue Bridge
//!
//! Provider-agnostic message producers and consumers for AWS SQS, AWS SNS and
//! an in-memory queue.
//!
//! This library provides:
//! - A single send / receive / acknowledge API across providers
//! - Validation of message attributes before anything is sent
//! - Automatic visibility heartbeats for in-flight messages
//! - Configuration loading from files and environment variables
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Received messages, identifiers and receipt handles
//! - [`attributes`] - Attribute validation and conversion
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Traits implemented by every provider
//! - [`providers`] - SQS, SNS and in-memory implementations
//! - [`heartbeat`] - Visibility renewal for in-flight messages
//! - [`producer`] / [`consumer`] - The facades callers use
//! - [`factory`] - Producer and consumer construction from configuration
//!
//! ## Example
//!
//! ```no_run
//! use queue_bridge::{MessageConsumer, MessageProducer, QueueClientFactory, QueueConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QueueConfig::load(None, "QUEUE_BRIDGE")?;
//! let factory = QueueClientFactory::new();
//!
//! let producer = factory.create_producer(&config).await?;
//! producer.send("hello").await?;
//!
//! let consumer = factory.create_consumer(&config).await?;
//! for message in consumer.receive_with_timeout(10).await? {
//!     println!("{}", message.body());
//!     consumer.acknowledge(&message).await?;
//! }
//! consumer.close().await;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod attributes;
pub mod client;
pub mod consumer;
pub mod error;
pub mod factory;
pub mod heartbeat;
pub mod message;
pub mod producer;
pub mod provider;
pub mod providers;

#[cfg(test)]
mod test_support;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// Re-export commonly used types at crate root for convenience
pub use attributes::{AttributeDataType, AttributeValue, Attributes, TypedAttribute};
pub use client::{ConsumerClient, ProducerClient, ReceivedPayload};
pub use consumer::{MessageConsumer, QueueConsumer};
pub use error::{AttributeError, ConfigurationError, QueueError};
pub use factory::{
    Consumer, InMemoryConsumer, InMemoryProducer, Producer, QueueClientFactory, SnsProducer,
    SqsConsumer, SqsProducer,
};
pub use heartbeat::HeartbeatScheduler;
pub use message::{Message, MessageId, Metadata, ReceiptHandle, RECEIPT_HANDLE};
pub use producer::{MessageProducer, QueueProducer};
pub use provider::{
    HeartbeatConfig, InMemoryConfig, ProviderType, QueueConfig, SnsConfig, SqsConfig,
};
pub use providers::{InMemoryBroker, InMemoryQueue, SnsClient, SqsClient};
