//! Queue provider implementations.
//!
//! This module contains concrete implementations of the `ProducerClient` and
//! `ConsumerClient` traits for different queue backends.

use crate::attributes::TypedAttribute;
use crate::error::QueueError;
use crate::provider::ProviderType;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::collections::HashMap;
use std::fmt::{Debug, Display};

pub mod memory;
pub mod sns;
pub mod sqs;

pub use memory::{InMemoryBroker, InMemoryQueue};
pub use sns::SnsClient;
pub use sqs::SqsClient;

/// Error codes AWS returns once a receipt handle can no longer be used
const EXPIRED_RECEIPT_CODES: &[&str] = &["MessageNotInflight", "ReceiptHandleIsInvalid"];

/// Build vendor attribute values from converted attributes.
///
/// `build` receives each attribute's data type and string value; a build
/// failure is reported as an `InvalidAttribute` provider error naming the key.
pub(crate) fn build_sdk_attributes<T, E, F>(
    provider: ProviderType,
    attributes: &HashMap<String, TypedAttribute>,
    build: F,
) -> Result<HashMap<String, T>, QueueError>
where
    E: Display,
    F: Fn(&str, &str) -> Result<T, E>,
{
    attributes
        .iter()
        .map(|(key, attr)| {
            build(attr.data_type.as_str(), &attr.string_value)
                .map(|value| (key.clone(), value))
                .map_err(|e| QueueError::ProviderError {
                    provider: provider.to_string(),
                    code: "InvalidAttribute".to_string(),
                    message: format!("attribute '{}': {}", key, e),
                })
        })
        .collect()
}

/// Map an AWS SDK failure onto the queue error taxonomy
pub(crate) fn map_sdk_error<E, R>(
    provider: ProviderType,
    operation: &str,
    receipt: Option<&str>,
    error: SdkError<E, R>,
) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: Debug,
{
    match &error {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            return QueueError::ConnectionFailed {
                message: format!("{} failed: {}", operation, DisplayErrorContext(&error)),
            };
        }
        _ => {}
    }

    let code = error.code().unwrap_or("Unknown").to_string();

    if let Some(receipt) = receipt {
        if EXPIRED_RECEIPT_CODES
            .iter()
            .any(|expired| code.contains(expired))
        {
            return QueueError::ReceiptExpired {
                receipt: receipt.to_string(),
            };
        }
    }

    QueueError::ProviderError {
        provider: provider.to_string(),
        code,
        message: format!("{} failed: {}", operation, DisplayErrorContext(&error)),
    }
}
