//! Visibility heartbeats for in-flight messages.
//!
//! A consumer with a non-zero heartbeat interval registers every received
//! message here. Each registration owns one periodic task that extends the
//! message's visibility to twice the interval, so the provider does not hand
//! the message to another worker while it is still being processed.
//!
//! ## Lifetime of a registration
//!
//! - Created on receive, keyed by message id.
//! - Replaced if the same id is registered again: the new task is installed
//!   first and the old one is aborted afterwards, so at most one task per id
//!   is ever active.
//! - Removed and aborted when the message is acknowledged or the scheduler is
//!   shut down. There is no timeout; an unacknowledged message is renewed until
//!   one of those happens.
//!
//! ## Worker pool
//!
//! Ticks run on spawned tokio tasks, but every visibility extension has to hold
//! a permit from a semaphore sized by `worker_pool_size`. Shutting down closes
//! the semaphore, so a tick that was waiting for a permit exits instead of
//! issuing a request.

use crate::client::ConsumerClient;
use crate::message::{MessageId, ReceiptHandle};
use crate::provider::HeartbeatConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;

/// Active renewal for one delivery
struct Registration {
    receipt: ReceiptHandle,
    task: JoinHandle<()>,
}

/// Registration table plus the shutdown flag guarding it
#[derive(Default)]
struct RegistrationTable {
    entries: HashMap<MessageId, Registration>,
    closed: bool,
}

/// Schedules periodic visibility extensions for in-flight messages
pub struct HeartbeatScheduler<C: ConsumerClient + 'static> {
    client: Arc<C>,
    config: HeartbeatConfig,
    permits: Arc<Semaphore>,
    registrations: Mutex<RegistrationTable>,
}

impl<C: ConsumerClient + 'static> HeartbeatScheduler<C> {
    /// Create new scheduler renewing through `client`
    pub fn new(client: Arc<C>, config: HeartbeatConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            client,
            config,
            permits,
            registrations: Mutex::new(RegistrationTable::default()),
        }
    }

    /// Check if registrations will be created at all
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    /// Start renewing a delivery, replacing any registration for the same id.
    ///
    /// Returns `false` without scheduling anything when heartbeats are disabled
    /// or the scheduler has been shut down.
    pub fn register(&self, message_id: MessageId, receipt: ReceiptHandle) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let previous = {
            let mut table = self.lock();
            if table.closed {
                debug!(message_id = %message_id, "Scheduler closed; heartbeat not registered");
                return false;
            }

            let task = tokio::spawn(renew(
                Arc::clone(&self.client),
                Arc::clone(&self.permits),
                message_id.clone(),
                receipt.clone(),
                Instant::now() + self.config.interval(),
                self.config.interval(),
                self.config.visibility_extension_seconds(),
            ));

            table
                .entries
                .insert(message_id.clone(), Registration { receipt, task })
        };

        if let Some(previous) = previous {
            previous.task.abort();
            debug!(message_id = %message_id, "Replaced existing heartbeat registration");
        } else {
            debug!(message_id = %message_id, "Registered heartbeat");
        }

        true
    }

    /// Stop renewing a delivery.
    ///
    /// The registration is only removed while it still belongs to `receipt`;
    /// a newer delivery of the same id keeps its renewal. Returns `true` if a
    /// registration was cancelled.
    pub fn cancel(&self, message_id: &MessageId, receipt: &ReceiptHandle) -> bool {
        let removed = {
            let mut table = self.lock();
            let owned = table
                .entries
                .get(message_id)
                .is_some_and(|registration| &registration.receipt == receipt);
            if owned {
                table.entries.remove(message_id)
            } else {
                None
            }
        };

        match removed {
            Some(registration) => {
                registration.task.abort();
                debug!(message_id = %message_id, "Cancelled heartbeat");
                true
            }
            None => false,
        }
    }

    /// Check if a message id currently has an active renewal
    pub fn is_registered(&self, message_id: &MessageId) -> bool {
        self.lock().entries.contains_key(message_id)
    }

    /// Number of active registrations
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel every registration and refuse new ones. Idempotent.
    ///
    /// Returns the number of registrations that were cancelled.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<Registration> = {
            let mut table = self.lock();
            table.closed = true;
            table.entries.drain().map(|(_, registration)| registration).collect()
        };

        self.permits.close();
        for registration in &drained {
            registration.task.abort();
        }

        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationTable> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: ConsumerClient + 'static> Drop for HeartbeatScheduler<C> {
    fn drop(&mut self) {
        let table = self
            .registrations
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, registration) in table.entries.drain() {
            registration.task.abort();
        }
    }
}

/// Renewal loop for one delivery. Runs until aborted or the pool is closed.
async fn renew<C: ConsumerClient>(
    client: Arc<C>,
    permits: Arc<Semaphore>,
    message_id: MessageId,
    receipt: ReceiptHandle,
    first_tick: Instant,
    period: Duration,
    extension_seconds: u64,
) {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Ok(_permit) = permits.acquire().await else {
            debug!(message_id = %message_id, "Heartbeat pool closed; stopping renewal");
            return;
        };

        // Failures never end the loop; only abort or pool shutdown does.
        match client.extend_visibility(&receipt, extension_seconds).await {
            Ok(()) => {
                debug!(
                    message_id = %message_id,
                    extension_seconds = extension_seconds,
                    "Extended message visibility"
                );
            }
            Err(e) => {
                warn!(
                    message_id = %message_id,
                    error = %e,
                    "Failed to send heartbeat for message"
                );
            }
        }
    }
}
