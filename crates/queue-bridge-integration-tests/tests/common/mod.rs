//! Common test utilities for queue-bridge integration tests
//!
//! This module provides:
//! - A consumer client wrapper that records and can fail visibility extensions
//! - Helper functions for creating in-memory configurations

use async_trait::async_trait;
use queue_bridge::{
    ConsumerClient, HeartbeatConfig, InMemoryConfig, InMemoryQueue, ProviderType, QueueConfig,
    QueueError, ReceiptHandle, ReceivedPayload,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Configuration Helpers
// ============================================================================

#[allow(dead_code)]
pub fn memory_config(queue_name: &str) -> InMemoryConfig {
    InMemoryConfig::default().with_queue_name(queue_name)
}

/// In-memory configuration with a short visibility timeout and heartbeats
#[allow(dead_code)]
pub fn heartbeat_config(queue_name: &str, visibility: u64, interval: u64) -> QueueConfig {
    QueueConfig::InMemory(
        memory_config(queue_name)
            .with_visibility_timeout(visibility)
            .with_heartbeat(HeartbeatConfig::new(interval, 2)),
    )
}

// ============================================================================
// Observed Consumer Client
// ============================================================================

/// Wraps an in-memory queue and records every visibility extension
#[derive(Clone)]
#[allow(dead_code)]
pub struct ObservedClient {
    inner: Arc<InMemoryQueue>,
    extensions: Arc<Mutex<Vec<(ReceiptHandle, u64)>>>,
    deletes: Arc<Mutex<Vec<ReceiptHandle>>>,
    fail_extensions: Arc<AtomicBool>,
}

impl ObservedClient {
    #[allow(dead_code)]
    pub fn new(inner: InMemoryQueue) -> Self {
        Self {
            inner: Arc::new(inner),
            extensions: Arc::new(Mutex::new(Vec::new())),
            deletes: Arc::new(Mutex::new(Vec::new())),
            fail_extensions: Arc::new(AtomicBool::new(false)),
        }
    }

    #[allow(dead_code)]
    pub fn queue(&self) -> &InMemoryQueue {
        &self.inner
    }

    #[allow(dead_code)]
    pub fn extensions(&self) -> Vec<(ReceiptHandle, u64)> {
        self.extensions.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn deletes(&self) -> Vec<ReceiptHandle> {
        self.deletes.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn fail_extensions(&self, fail: bool) {
        self.fail_extensions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConsumerClient for ObservedClient {
    async fn receive_batch(&self, timeout_seconds: u32) -> Result<Vec<ReceivedPayload>, QueueError> {
        self.inner.receive_batch(timeout_seconds).await
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.inner.delete(receipt).await?;
        self.deletes.lock().unwrap().push(receipt.clone());
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt: &ReceiptHandle,
        seconds: u64,
    ) -> Result<(), QueueError> {
        self.extensions
            .lock()
            .unwrap()
            .push((receipt.clone(), seconds));

        if self.fail_extensions.load(Ordering::SeqCst) {
            return Err(QueueError::ConnectionFailed {
                message: "injected failure".to_string(),
            });
        }
        self.inner.extend_visibility(receipt, seconds).await
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }
}
