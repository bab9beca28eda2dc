//! Tests for in-memory queue provider.

use super::*;
use crate::attributes::AttributeDataType;

fn config(name: &str) -> InMemoryConfig {
    InMemoryConfig::default().with_queue_name(name)
}

async fn publish(queue: &InMemoryQueue, body: &str) {
    queue.publish(body, &HashMap::new()).await.unwrap();
}

// ============================================================================
// Broker
// ============================================================================

mod broker {
    use super::*;

    #[tokio::test]
    async fn test_same_name_shares_messages() {
        let broker = InMemoryBroker::new();
        let producer = broker.queue(&config("jobs"));
        let consumer = broker.queue(&config("jobs"));

        publish(&producer, "hello").await;

        let batch = consumer.receive_batch(0).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "hello");
    }

    #[tokio::test]
    async fn test_different_names_are_isolated() {
        let broker = InMemoryBroker::new();
        let jobs = broker.queue(&config("jobs"));
        let events = broker.queue(&config("events"));

        publish(&jobs, "hello").await;

        assert!(events.receive_batch(0).await.unwrap().is_empty());
        assert_eq!(broker.queue_names(), vec!["events", "jobs"]);
    }

    #[tokio::test]
    async fn test_standalone_queues_are_independent() {
        let first = InMemoryQueue::new(&config("jobs"));
        let second = InMemoryQueue::new(&config("jobs"));

        publish(&first, "hello").await;

        assert_eq!(first.visible_count(), 1);
        assert_eq!(second.visible_count(), 0);
    }
}

// ============================================================================
// Publish and Receive
// ============================================================================

mod publish_receive {
    use super::*;

    #[tokio::test]
    async fn test_receive_preserves_order_and_attributes() {
        let queue = InMemoryQueue::new(&config("jobs"));
        let mut attributes = HashMap::new();
        attributes.insert(
            "priority".to_string(),
            TypedAttribute::new(AttributeDataType::Number, "5"),
        );

        queue.publish("first", &attributes).await.unwrap();
        publish(&queue, "second").await;

        let batch = queue.receive_batch(0).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].body, "first");
        assert_eq!(batch[1].body, "second");
        assert_eq!(batch[0].attributes, attributes);
        assert_eq!(
            batch[0].system_attributes.get("ApproximateReceiveCount"),
            Some(&"1".to_string())
        );
        assert!(batch[0].receipt_handle.is_some());
    }

    #[tokio::test]
    async fn test_batch_size_limited_by_max_messages() {
        let mut cfg = config("jobs");
        cfg.max_messages = 2;
        let queue = InMemoryQueue::new(&cfg);

        for n in 0..5 {
            publish(&queue, &format!("message-{}", n)).await;
        }

        assert_eq!(queue.receive_batch(0).await.unwrap().len(), 2);
        assert_eq!(queue.visible_count(), 3);
        assert_eq!(queue.in_flight_count(), 2);
    }

    #[tokio::test]
    async fn test_received_messages_are_hidden() {
        let queue = InMemoryQueue::new(&config("jobs"));
        publish(&queue, "hello").await;

        assert_eq!(queue.receive_batch(0).await.unwrap().len(), 1);
        assert!(queue.receive_batch(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_message_rejected() {
        let queue = InMemoryQueue::new(&config("jobs"));
        let body = "x".repeat(ProviderType::InMemory.max_message_size() + 1);

        match queue.publish(&body, &HashMap::new()).await {
            Err(QueueError::ProviderError { code, .. }) => assert_eq!(code, "MessageTooLong"),
            other => panic!("Expected ProviderError, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_receive_waits_for_timeout() {
        let queue = InMemoryQueue::new(&config("jobs"));
        let started = Instant::now();

        let batch = queue.receive_batch(3).await.unwrap();

        assert!(batch.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_wakes_on_publish() {
        let broker = InMemoryBroker::new();
        let consumer = broker.queue(&config("jobs"));
        let producer = broker.queue(&config("jobs"));

        let waiter = tokio::spawn(async move {
            let started = Instant::now();
            let batch = consumer.receive_batch(20).await.unwrap();
            (batch, started.elapsed())
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        publish(&producer, "late").await;

        let (batch, elapsed) = waiter.await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "late");
        assert!(elapsed < Duration::from_secs(20));
    }
}

// ============================================================================
// Visibility
// ============================================================================

mod visibility {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expired_message_is_redelivered_with_new_receipt() {
        let queue = InMemoryQueue::new(&config("jobs").with_visibility_timeout(10));
        publish(&queue, "hello").await;

        let first = queue.receive_batch(0).await.unwrap().remove(0);
        tokio::time::sleep(Duration::from_secs(11)).await;

        let second = queue.receive_batch(0).await.unwrap().remove(0);
        assert_eq!(first.message_id, second.message_id);
        assert_ne!(first.receipt_handle, second.receipt_handle);
        assert_eq!(
            second.system_attributes.get("ApproximateReceiveCount"),
            Some(&"2".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_keeps_message_hidden() {
        let queue = InMemoryQueue::new(&config("jobs").with_visibility_timeout(10));
        publish(&queue, "hello").await;

        let delivery = queue.receive_batch(0).await.unwrap().remove(0);
        let receipt = delivery.receipt_handle.unwrap();

        tokio::time::sleep(Duration::from_secs(8)).await;
        queue.extend_visibility(&receipt, 20).await.unwrap();
        tokio::time::sleep(Duration::from_secs(8)).await;

        assert!(queue.receive_batch(0).await.unwrap().is_empty());
        assert_eq!(queue.in_flight_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_after_expiry_fails() {
        let queue = InMemoryQueue::new(&config("jobs").with_visibility_timeout(5));
        publish(&queue, "hello").await;

        let receipt = queue.receive_batch(0).await.unwrap()[0]
            .receipt_handle
            .clone()
            .unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(matches!(
            queue.extend_visibility(&receipt, 10).await,
            Err(QueueError::ReceiptExpired { .. })
        ));
        assert_eq!(queue.visible_count(), 1);
    }

    #[tokio::test]
    async fn test_extend_beyond_maximum_rejected() {
        let queue = InMemoryQueue::new(&config("jobs"));
        publish(&queue, "hello").await;
        let receipt = queue.receive_batch(0).await.unwrap()[0]
            .receipt_handle
            .clone()
            .unwrap();

        assert!(matches!(
            queue
                .extend_visibility(&receipt, MAX_VISIBILITY_TIMEOUT_SECONDS + 1)
                .await,
            Err(QueueError::ProviderError { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_poll_wakes_on_visibility_expiry() {
        let queue = InMemoryQueue::new(&config("jobs").with_visibility_timeout(3));
        publish(&queue, "hello").await;
        queue.receive_batch(0).await.unwrap();

        let batch = queue.receive_batch(20).await.unwrap();

        assert_eq!(batch.len(), 1);
    }
}

// ============================================================================
// Delete
// ============================================================================

mod delete {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deleted_message_never_returns() {
        let queue = InMemoryQueue::new(&config("jobs").with_visibility_timeout(5));
        publish(&queue, "hello").await;

        let receipt = queue.receive_batch(0).await.unwrap()[0]
            .receipt_handle
            .clone()
            .unwrap();
        queue.delete(&receipt).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(queue.receive_batch(0).await.unwrap().is_empty());
        assert_eq!(queue.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let queue = InMemoryQueue::new(&config("jobs"));
        publish(&queue, "hello").await;
        let receipt = queue.receive_batch(0).await.unwrap()[0]
            .receipt_handle
            .clone()
            .unwrap();

        queue.delete(&receipt).await.unwrap();
        queue.delete(&receipt).await.unwrap();
        queue
            .delete(&ReceiptHandle::new("never-issued"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_extend_after_delete_fails() {
        let queue = InMemoryQueue::new(&config("jobs"));
        publish(&queue, "hello").await;
        let receipt = queue.receive_batch(0).await.unwrap()[0]
            .receipt_handle
            .clone()
            .unwrap();

        queue.delete(&receipt).await.unwrap();

        assert!(matches!(
            queue.extend_visibility(&receipt, 10).await,
            Err(QueueError::ReceiptExpired { .. })
        ));
    }
}
