//! AWS SQS provider implementation using the AWS SDK.
//!
//! ## Key Features
//!
//! - **Long polling**: Receive waits up to 20 seconds for messages
//! - **Batch receive**: Up to 10 messages per request
//! - **Message attributes**: String and Number attributes in both directions
//! - **Visibility extension**: `ChangeMessageVisibility` backs the heartbeat
//!
//! ## Authentication
//!
//! Credentials come from the default AWS provider chain (environment,
//! profile, instance metadata). Setting `endpoint` routes requests to a local
//! emulator such as LocalStack or ElasticMQ.
//!
//! ## Receipt Handles
//!
//! A receipt handle is valid for a single delivery. Once SQS reports it as
//! invalid or no longer in flight, delete and extend calls fail with
//! [`QueueError::ReceiptExpired`].

use super::{build_sdk_attributes, map_sdk_error};
use crate::attributes::{AttributeDataType, TypedAttribute};
use crate::client::{ConsumerClient, ProducerClient, ReceivedPayload};
use crate::error::QueueError;
use crate::message::{MessageId, ReceiptHandle};
use crate::provider::{ProviderType, SqsConfig, MAX_RECEIVE_BATCH};
use async_trait::async_trait;
use aws_sdk_sqs::config::{BehaviorVersion, Region};
use aws_sdk_sqs::types::{Message as SdkMessage, MessageAttributeValue, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "sqs_tests.rs"]
mod tests;

/// Longest wait SQS accepts for a single receive request
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;

// ============================================================================
// SqsClient
// ============================================================================

/// SQS client bound to a single queue URL
pub struct SqsClient {
    client: Client,
    queue_url: String,
    max_messages: i32,
}

impl SqsClient {
    /// Connect using the default AWS credential chain
    pub async fn connect(config: &SqsConfig) -> Result<Self, QueueError> {
        config.validate()?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint_override() {
            debug!(endpoint = %endpoint, "Using custom SQS endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::with_client(Client::from_conf(builder.build()), config))
    }

    /// Wrap an already configured SDK client
    pub fn with_client(client: Client, config: &SqsConfig) -> Self {
        let max_messages = config.max_messages.clamp(1, MAX_RECEIVE_BATCH) as i32;
        Self {
            client,
            queue_url: config.queue_url.clone(),
            max_messages,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    pub fn max_messages(&self) -> i32 {
        self.max_messages
    }
}

/// Build SDK attribute values from converted attributes
pub(crate) fn to_sdk_attributes(
    attributes: &HashMap<String, TypedAttribute>,
) -> Result<HashMap<String, MessageAttributeValue>, QueueError> {
    build_sdk_attributes(ProviderType::Sqs, attributes, |data_type, value| {
        MessageAttributeValue::builder()
            .data_type(data_type)
            .string_value(value)
            .build()
    })
}

/// Convert an SDK message into a received payload.
///
/// Returns `None` when SQS omitted the message id. Binary attributes have no
/// string form and are skipped.
pub(crate) fn from_sdk_message(message: &SdkMessage) -> Option<ReceivedPayload> {
    let message_id = message
        .message_id()
        .filter(|id| !id.is_empty())
        .map(MessageId::from)?;

    let receipt = message
        .receipt_handle()
        .filter(|handle| !handle.is_empty())
        .map(ReceiptHandle::new);

    let mut payload = ReceivedPayload {
        message_id,
        body: message.body().unwrap_or_default().to_string(),
        receipt_handle: receipt,
        attributes: HashMap::new(),
        system_attributes: HashMap::new(),
    };

    if let Some(attributes) = message.message_attributes() {
        for (key, value) in attributes {
            let (Some(data_type), Some(string_value)) = (
                AttributeDataType::from_provider(value.data_type()),
                value.string_value(),
            ) else {
                debug!(key = %key, data_type = %value.data_type(), "Skipping attribute without string form");
                continue;
            };
            payload
                .attributes
                .insert(key.clone(), TypedAttribute::new(data_type, string_value));
        }
    }

    if let Some(system) = message.attributes() {
        for (name, value) in system {
            payload
                .system_attributes
                .insert(name.as_str().to_string(), value.clone());
        }
    }

    Some(payload)
}

#[async_trait]
impl ProducerClient for SqsClient {
    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, TypedAttribute>,
    ) -> Result<(), QueueError> {
        let sdk_attributes = to_sdk_attributes(attributes)?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(payload)
            .set_message_attributes((!sdk_attributes.is_empty()).then_some(sdk_attributes))
            .send()
            .await
            .map_err(|e| map_sdk_error(ProviderType::Sqs, "SendMessage", None, e))?;

        debug!(
            queue_url = %self.queue_url,
            message_id = output.message_id().unwrap_or_default(),
            "Message sent to SQS"
        );
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Sqs
    }
}

#[async_trait]
impl ConsumerClient for SqsClient {
    async fn receive_batch(&self, timeout_seconds: u32) -> Result<Vec<ReceivedPayload>, QueueError> {
        let wait = timeout_seconds.min(MAX_WAIT_TIME_SECONDS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(wait)
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(|e| map_sdk_error(ProviderType::Sqs, "ReceiveMessage", None, e))?;

        let mut batch = Vec::with_capacity(output.messages().len());
        for message in output.messages() {
            match from_sdk_message(message) {
                Some(payload) => batch.push(payload),
                None => warn!(queue_url = %self.queue_url, "Dropping SQS message without a message id"),
            }
        }

        debug!(queue_url = %self.queue_url, count = batch.len(), "Received SQS batch");
        Ok(batch)
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt.as_str())
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(ProviderType::Sqs, "DeleteMessage", Some(receipt.as_str()), e)
            })?;
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt: &ReceiptHandle,
        seconds: u64,
    ) -> Result<(), QueueError> {
        let timeout = i32::try_from(seconds).map_err(|_| QueueError::ProviderError {
            provider: ProviderType::Sqs.to_string(),
            code: "InvalidParameterValue".to_string(),
            message: format!("visibility timeout {} out of range", seconds),
        })?;

        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt.as_str())
            .visibility_timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                map_sdk_error(
                    ProviderType::Sqs,
                    "ChangeMessageVisibility",
                    Some(receipt.as_str()),
                    e,
                )
            })?;
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Sqs
    }
}
