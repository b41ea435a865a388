//! In-memory queue for tests and single-process runs.

use anyhow::Result;
use async_trait::async_trait;
use draftwire_common::QueueMessage;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{Delivery, WorkQueue};

/// FIFO queue backed by a Vec. `drain` hands the pending messages to a
/// consumer as one batch; retried messages are re-sent by the caller.
#[derive(Default)]
pub struct MemoryQueue {
    pending: Mutex<Vec<Delivery>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything currently pending as a batch.
    pub async fn drain(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Number of pending deliveries.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }

    /// Decode the pending messages without consuming them. Test helper.
    pub async fn pending_messages(&self) -> Vec<QueueMessage> {
        self.pending
            .lock()
            .await
            .iter()
            .filter_map(|d| serde_json::from_value(d.body.clone()).ok())
            .collect()
    }

    /// Put a delivery back with its attempt count bumped, as a queue
    /// backend would after the retry delay.
    pub async fn redeliver(&self, mut delivery: Delivery) {
        delivery.attempts += 1;
        self.pending.lock().await.push(delivery);
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn send(&self, message: QueueMessage) -> Result<()> {
        let delivery = Delivery::new(
            Uuid::new_v4().to_string(),
            serde_json::to_value(&message)?,
        );
        self.pending.lock().await.push(delivery);
        Ok(())
    }
}
