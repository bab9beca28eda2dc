//! Recording client shared by the unit tests.

use crate::attributes::TypedAttribute;
use crate::client::{ConsumerClient, ProducerClient, ReceivedPayload};
use crate::error::QueueError;
use crate::message::{MessageId, ReceiptHandle};
use crate::provider::ProviderType;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) type Published = (String, HashMap<String, TypedAttribute>);

/// Mock client that records every request and can be told to fail
#[derive(Default)]
pub(crate) struct RecordingClient {
    published: Mutex<Vec<Published>>,
    batches: Mutex<VecDeque<Vec<ReceivedPayload>>>,
    deleted: Mutex<Vec<ReceiptHandle>>,
    extended: Mutex<Vec<(ReceiptHandle, u64)>>,
    extend_delay: Mutex<Option<Duration>>,
    fail_publish: AtomicBool,
    fail_deletes: AtomicBool,
    fail_extends: AtomicBool,
    attributes_unsupported: AtomicBool,
    active_extends: AtomicUsize,
    max_active_extends: AtomicUsize,
    close_calls: AtomicUsize,
}

impl RecordingClient {
    pub fn without_attribute_support() -> Self {
        let client = Self::default();
        client.attributes_unsupported.store(true, Ordering::SeqCst);
        client
    }

    /// Queue a batch for the next receive call
    pub fn push_batch(&self, batch: Vec<ReceivedPayload>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn set_extend_delay(&self, delay: Duration) {
        *self.extend_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_extends(&self, fail: bool) {
        self.fail_extends.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<ReceiptHandle> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn extended(&self) -> Vec<(ReceiptHandle, u64)> {
        self.extended.lock().unwrap().clone()
    }

    pub fn extend_count_for(&self, receipt: &ReceiptHandle) -> usize {
        self.extended()
            .iter()
            .filter(|(handle, _)| handle == receipt)
            .count()
    }

    pub fn max_concurrent_extends(&self) -> usize {
        self.max_active_extends.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

/// Build a delivery whose receipt is derived from the id
pub(crate) fn payload(id: &str, body: &str) -> ReceivedPayload {
    ReceivedPayload::new(
        MessageId::from(id),
        body,
        ReceiptHandle::new(format!("receipt-{}", id)),
    )
}

fn transport_failure(operation: &str) -> QueueError {
    QueueError::ConnectionFailed {
        message: format!("{} failed", operation),
    }
}

#[async_trait]
impl ProducerClient for RecordingClient {
    async fn publish(
        &self,
        payload: &str,
        attributes: &HashMap<String, TypedAttribute>,
    ) -> Result<(), QueueError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(transport_failure("publish"));
        }
        self.published
            .lock()
            .unwrap()
            .push((payload.to_string(), attributes.clone()));
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }

    fn supports_attributes(&self) -> bool {
        !self.attributes_unsupported.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConsumerClient for RecordingClient {
    async fn receive_batch(&self, _timeout_seconds: u32) -> Result<Vec<ReceivedPayload>, QueueError> {
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn delete(&self, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(transport_failure("delete"));
        }
        self.deleted.lock().unwrap().push(receipt.clone());
        Ok(())
    }

    async fn extend_visibility(
        &self,
        receipt: &ReceiptHandle,
        seconds: u64,
    ) -> Result<(), QueueError> {
        let active = self.active_extends.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_extends.fetch_max(active, Ordering::SeqCst);

        let delay = *self.extend_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.extended
            .lock()
            .unwrap()
            .push((receipt.clone(), seconds));
        self.active_extends.fetch_sub(1, Ordering::SeqCst);

        if self.fail_extends.load(Ordering::SeqCst) {
            return Err(QueueError::ReceiptExpired {
                receipt: receipt.to_string(),
            });
        }
        Ok(())
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::InMemory
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}
