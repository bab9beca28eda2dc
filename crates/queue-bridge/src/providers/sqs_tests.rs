//! Tests for the AWS SQS provider.
//!
//! These cover request and response mapping without reaching AWS; the client
//! is built offline and never sends a request.

use super::*;
use crate::providers::{build_sdk_attributes, map_sdk_error};
use aws_sdk_sqs::error::{ErrorMetadata, SdkError};
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;

fn offline_client() -> Client {
    let config = aws_sdk_sqs::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .build();
    Client::from_conf(config)
}

fn sqs_config() -> SqsConfig {
    SqsConfig::new(
        "https://sqs.us-east-1.amazonaws.com/123456789012/jobs",
        "us-east-1",
    )
}

mod construction {
    use super::*;

    #[test]
    fn test_with_client_uses_config() {
        let client = SqsClient::with_client(offline_client(), &sqs_config().with_max_messages(5));

        assert_eq!(
            client.queue_url(),
            "https://sqs.us-east-1.amazonaws.com/123456789012/jobs"
        );
        assert_eq!(client.max_messages(), 5);
        assert_eq!(ProducerClient::provider_type(&client), ProviderType::Sqs);
        assert_eq!(ConsumerClient::provider_type(&client), ProviderType::Sqs);
        assert!(client.supports_attributes());
    }

    #[test]
    fn test_batch_size_clamped_to_sqs_limit() {
        let client = SqsClient::with_client(offline_client(), &sqs_config().with_max_messages(50));
        assert_eq!(client.max_messages(), 10);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let result = SqsClient::connect(&SqsConfig::new("", "us-east-1")).await;
        assert!(matches!(result, Err(QueueError::Configuration(_))));
    }
}

mod attribute_mapping {
    use super::*;

    #[test]
    fn test_typed_attributes_become_sdk_values() {
        let mut attributes = HashMap::new();
        attributes.insert(
            "priority".to_string(),
            TypedAttribute::new(AttributeDataType::Number, "10"),
        );
        attributes.insert(
            "source".to_string(),
            TypedAttribute::new(AttributeDataType::String, "billing"),
        );

        let sdk = to_sdk_attributes(&attributes).unwrap();

        assert_eq!(sdk["priority"].data_type(), "Number");
        assert_eq!(sdk["priority"].string_value(), Some("10"));
        assert_eq!(sdk["source"].data_type(), "String");
        assert_eq!(sdk["source"].string_value(), Some("billing"));
    }

    #[test]
    fn test_attribute_build_failure_names_the_key() {
        let mut attributes = HashMap::new();
        attributes.insert(
            "priority".to_string(),
            TypedAttribute::new(AttributeDataType::Number, "10"),
        );

        let result = build_sdk_attributes(ProviderType::Sqs, &attributes, |_, _| {
            Err::<MessageAttributeValue, _>("missing data type")
        });

        match result {
            Err(QueueError::ProviderError {
                provider,
                code,
                message,
            }) => {
                assert_eq!(provider, ProviderType::Sqs.to_string());
                assert_eq!(code, "InvalidAttribute");
                assert!(message.contains("'priority'"));
            }
            other => panic!("Expected ProviderError, got {:?}", other),
        }
    }

    #[test]
    fn test_received_message_mapping() {
        let message = SdkMessage::builder()
            .message_id("m1")
            .receipt_handle("receipt-1")
            .body("{\"order\":1}")
            .message_attributes(
                "priority",
                MessageAttributeValue::builder()
                    .data_type("Number.int")
                    .string_value("3")
                    .build()
                    .unwrap(),
            )
            .message_attributes(
                "blob",
                MessageAttributeValue::builder()
                    .data_type("Binary")
                    .build()
                    .unwrap(),
            )
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "2")
            .build();

        let payload = from_sdk_message(&message).unwrap();

        assert_eq!(payload.message_id, MessageId::from("m1"));
        assert_eq!(payload.body, "{\"order\":1}");
        assert_eq!(payload.receipt_handle, Some(ReceiptHandle::new("receipt-1")));
        assert_eq!(
            payload.attributes.get("priority"),
            Some(&TypedAttribute::new(AttributeDataType::Number, "3"))
        );
        assert!(!payload.attributes.contains_key("blob"));
        assert_eq!(
            payload.system_attributes.get("ApproximateReceiveCount"),
            Some(&"2".to_string())
        );
    }

    #[test]
    fn test_message_without_receipt_keeps_body() {
        let message = SdkMessage::builder().message_id("m1").body("hello").build();

        let payload = from_sdk_message(&message).unwrap();

        assert!(payload.receipt_handle.is_none());
        assert_eq!(payload.body, "hello");
    }

    #[test]
    fn test_message_without_id_is_dropped() {
        let message = SdkMessage::builder().receipt_handle("r").body("hello").build();
        assert!(from_sdk_message(&message).is_none());
    }
}

mod error_mapping {
    use super::*;

    fn service_error(code: &str) -> SdkError<DeleteMessageError, ()> {
        let metadata = ErrorMetadata::builder().code(code).message("rejected").build();
        SdkError::service_error(DeleteMessageError::generic(metadata), ())
    }

    #[test]
    fn test_not_in_flight_maps_to_receipt_expired() {
        let error = map_sdk_error(
            ProviderType::Sqs,
            "DeleteMessage",
            Some("receipt-1"),
            service_error("AWS.SimpleQueueService.MessageNotInflight"),
        );

        match error {
            QueueError::ReceiptExpired { receipt } => assert_eq!(receipt, "receipt-1"),
            other => panic!("Expected ReceiptExpired, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_receipt_maps_to_receipt_expired() {
        let error = map_sdk_error(
            ProviderType::Sqs,
            "ChangeMessageVisibility",
            Some("receipt-1"),
            service_error("ReceiptHandleIsInvalid"),
        );

        assert!(matches!(error, QueueError::ReceiptExpired { .. }));
    }

    #[test]
    fn test_other_service_errors_keep_code() {
        let error = map_sdk_error(
            ProviderType::Sqs,
            "DeleteMessage",
            None,
            service_error("AccessDenied"),
        );

        match error {
            QueueError::ProviderError { provider, code, .. } => {
                assert_eq!(provider, "sqs");
                assert_eq!(code, "AccessDenied");
            }
            other => panic!("Expected ProviderError, got {:?}", other),
        }
    }

    #[test]
    fn test_timeouts_are_connection_failures() {
        let error = map_sdk_error(
            ProviderType::Sqs,
            "ReceiveMessage",
            None,
            SdkError::<DeleteMessageError, ()>::timeout_error("took too long"),
        );

        assert!(matches!(error, QueueError::ConnectionFailed { .. }));
        assert!(error.is_transient());
    }
}
