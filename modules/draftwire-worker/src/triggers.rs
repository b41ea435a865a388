//! Scheduled entry points: queue pumping and the recurring sweeps.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use draftwire_queue::{Delivery, Dispatcher, MemoryQueue, MessageRouter, Resolution};
use tracing::debug;

/// Drain the in-process queue and dispatch the batch. Retried deliveries
/// are put back after their backoff delay. Returns the batch size.
pub async fn pump_queue<R: MessageRouter>(
    queue: &Arc<MemoryQueue>,
    dispatcher: &Dispatcher<R>,
) -> usize {
    let batch = queue.drain().await;
    if batch.is_empty() {
        return 0;
    }
    let by_id: HashMap<String, Delivery> =
        batch.iter().map(|d| (d.id.clone(), d.clone())).collect();
    let size = batch.len();

    let outcome = dispatcher.process_batch(batch).await;
    for (id, resolution) in outcome.resolutions {
        if let Resolution::Retry { delay_seconds } = resolution {
            if let Some(delivery) = by_id.get(&id).cloned() {
                debug!(
                    delivery_id = id.as_str(),
                    delay_seconds, "Scheduling redelivery"
                );
                let queue = queue.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(delay_seconds)).await;
                    queue.redeliver(delivery).await;
                });
            }
        }
    }
    size
}
