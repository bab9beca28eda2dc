//! AWS SNS provider implementation using the AWS SDK.
//!
//! SNS is publish-only: messages go to a topic and fan out to its
//! subscriptions. There is no consumer side; consuming from SNS means
//! subscribing an SQS queue and consuming that queue instead.

use super::{build_sdk_attributes, map_sdk_error};
use crate::attributes::TypedAttribute;
use crate::client::ProducerClient;
use crate::error::QueueError;
use crate::provider::{ProviderType, SnsConfig};
use async_trait::async_trait;
use aws_sdk_sns::config::{BehaviorVersion, Region};
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use std::collections::HashMap;
use tracing::debug;

#[cfg(test)]
#[path = "sns_tests.rs"]
mod tests;

/// SNS client bound to a single topic
pub struct SnsClient {
    client: Client,
    topic_arn: String,
}

impl SnsClient {
    /// Connect using the default AWS credential chain
    pub async fn connect(config: &SnsConfig) -> Result<Self, QueueError> {
        config.validate()?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_sns::config::Builder::from(&sdk_config);
        if let Some(endpoint) = config.endpoint_override() {
            debug!(endpoint = %endpoint, "Using custom SNS endpoint");
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::with_client(Client::from_conf(builder.build()), config))
    }

    /// Wrap an already configured SDK client
    pub fn with_client(client: Client, config: &SnsConfig) -> Self {
        Self {
            client,
            topic_arn: config.topic_arn.clone(),
        }
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }
}

pub(crate) fn to_sdk_attributes(
    attributes: &HashMap<String, TypedAttribute>,
) -> Result<HashMap<String, MessageAttributeValue>, QueueError> {
    build_sdk_attributes(ProviderType::Sns, attributes, |data_type, value| {
        MessageAttributeValue::builder()
            .data_type(data_type)
            .string_value(value)
            .build()
    })
}

#[async_trait]
impl ProducerClient for SnsClient {
    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, TypedAttribute>,
    ) -> Result<(), QueueError> {
        let sdk_attributes = to_sdk_attributes(attributes)?;

        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(payload)
            .set_message_attributes((!sdk_attributes.is_empty()).then_some(sdk_attributes))
            .send()
            .await
            .map_err(|e| map_sdk_error(ProviderType::Sns, "Publish", None, e))?;

        debug!(
            topic_arn = %self.topic_arn,
            message_id = output.message_id().unwrap_or_default(),
            "Message published to SNS"
        );
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Sns
    }
}
