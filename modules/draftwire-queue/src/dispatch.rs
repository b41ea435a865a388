//! Batch dispatch: decode, route, resolve.
//!
//! Every delivery in a batch gets exactly one resolution. A handler failure
//! resolves its own message to a delayed retry and never blocks siblings.
//! Deliveries sharing a partition key (workflow id) run strictly
//! sequentially; distinct keys run concurrently.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use draftwire_common::QueueMessage;
use futures::future::join_all;
use tracing::{info, warn};

use crate::Delivery;

/// Fixed backoff before a failed message is redelivered.
pub const RETRY_DELAY_SECONDS: u64 = 60;

/// What to do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Remove the message from the queue.
    Ack,
    /// Redeliver after a delay.
    Retry { delay_seconds: u64 },
}

/// Resolution for every delivery in a batch, in delivery order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub resolutions: Vec<(String, Resolution)>,
}

impl BatchOutcome {
    pub fn acked(&self) -> usize {
        self.resolutions
            .iter()
            .filter(|(_, r)| *r == Resolution::Ack)
            .count()
    }

    pub fn retried(&self) -> usize {
        self.resolutions.len() - self.acked()
    }

    pub fn resolution_for(&self, delivery_id: &str) -> Option<Resolution> {
        self.resolutions
            .iter()
            .find(|(id, _)| id == delivery_id)
            .map(|(_, r)| *r)
    }
}

/// Routes a decoded message to the handler for its type.
///
/// Implementations match exhaustively over [`QueueMessage`]; a returned
/// error means "retry this message later", so only downstream failures
/// should propagate — stale or out-of-order deliveries are handled inside
/// and return Ok.
#[async_trait]
pub trait MessageRouter: Send + Sync {
    async fn route(&self, message: QueueMessage) -> Result<()>;
}

/// Demultiplexes queue batches to a [`MessageRouter`].
pub struct Dispatcher<R: MessageRouter> {
    router: R,
}

impl<R: MessageRouter> Dispatcher<R> {
    pub fn new(router: R) -> Self {
        Self { router }
    }

    /// Process one batch. Returns a resolution for every delivery.
    pub async fn process_batch(&self, deliveries: Vec<Delivery>) -> BatchOutcome {
        let order: Vec<String> = deliveries.iter().map(|d| d.id.clone()).collect();
        let mut resolved: HashMap<String, Resolution> = HashMap::new();

        // Decode envelopes. An unknown or malformed `type` tag is a
        // forward-compatible no-op: acknowledge so it never retries forever.
        let mut groups: Vec<(String, Vec<(String, QueueMessage)>)> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        for delivery in deliveries {
            match serde_json::from_value::<QueueMessage>(delivery.body.clone()) {
                Ok(message) => {
                    let key = message.partition_key().to_string();
                    let idx = *group_index.entry(key.clone()).or_insert_with(|| {
                        groups.push((key, Vec::new()));
                        groups.len() - 1
                    });
                    groups[idx].1.push((delivery.id, message));
                }
                Err(e) => {
                    warn!(
                        delivery_id = delivery.id.as_str(),
                        error = %e,
                        "Unknown queue message type, acknowledging without action"
                    );
                    resolved.insert(delivery.id, Resolution::Ack);
                }
            }
        }

        // Groups run concurrently; messages within a group run in order so
        // two steps of the same workflow never race the read-modify-write.
        let group_results = join_all(groups.into_iter().map(|(_, messages)| async move {
            let mut resolutions = Vec::with_capacity(messages.len());
            for (delivery_id, message) in messages {
                let type_name = message.type_name();
                let item_id = message.item_id().to_string();
                match self.router.route(message).await {
                    Ok(()) => {
                        resolutions.push((delivery_id, Resolution::Ack));
                    }
                    Err(e) => {
                        warn!(
                            message_type = type_name,
                            item_id = item_id.as_str(),
                            error = %e,
                            "Handler failed, scheduling retry"
                        );
                        resolutions.push((
                            delivery_id,
                            Resolution::Retry {
                                delay_seconds: RETRY_DELAY_SECONDS,
                            },
                        ));
                    }
                }
            }
            resolutions
        }))
        .await;

        for resolutions in group_results {
            for (id, resolution) in resolutions {
                resolved.insert(id, resolution);
            }
        }

        let resolutions: Vec<(String, Resolution)> = order
            .into_iter()
            .map(|id| {
                let resolution = resolved.remove(&id).unwrap_or_else(|| {
                    // Unreachable by construction; resolve rather than drop.
                    warn!(delivery_id = id.as_str(), "Delivery missing a resolution");
                    Resolution::Retry {
                        delay_seconds: RETRY_DELAY_SECONDS,
                    }
                });
                (id, resolution)
            })
            .collect();

        let outcome = BatchOutcome { resolutions };
        info!(
            acked = outcome.acked(),
            retried = outcome.retried(),
            "Batch processed"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Records routed messages; fails those whose item id is in `fail_on`.
    struct ScriptedRouter {
        seen: Arc<Mutex<Vec<QueueMessage>>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl MessageRouter for ScriptedRouter {
        async fn route(&self, message: QueueMessage) -> Result<()> {
            self.seen.lock().await.push(message.clone());
            if self.fail_on.iter().any(|id| id == message.item_id()) {
                bail!("downstream failure for {}", message.item_id());
            }
            Ok(())
        }
    }

    fn delivery(id: &str, message: &QueueMessage) -> Delivery {
        Delivery::new(id, serde_json::to_value(message).unwrap())
    }

    #[tokio::test]
    async fn every_delivery_resolved_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(ScriptedRouter {
            seen: seen.clone(),
            fail_on: vec!["bad".to_string()],
        });

        let outcome = dispatcher
            .process_batch(vec![
                delivery("d1", &QueueMessage::Research { item_id: "ok".into() }),
                delivery("d2", &QueueMessage::Publish { item_id: "bad".into() }),
                delivery("d3", &QueueMessage::Crosspost { item_id: "also-ok".into() }),
            ])
            .await;

        assert_eq!(outcome.resolutions.len(), 3);
        assert_eq!(outcome.resolution_for("d1"), Some(Resolution::Ack));
        assert_eq!(
            outcome.resolution_for("d2"),
            Some(Resolution::Retry {
                delay_seconds: RETRY_DELAY_SECONDS
            })
        );
        assert_eq!(outcome.resolution_for("d3"), Some(Resolution::Ack));
        assert_eq!(seen.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn unknown_type_is_acked_without_routing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(ScriptedRouter {
            seen: seen.clone(),
            fail_on: vec![],
        });

        let outcome = dispatcher
            .process_batch(vec![Delivery::new(
                "d1",
                serde_json::json!({"type": "transmogrify", "item_id": "abc"}),
            )])
            .await;

        assert_eq!(outcome.resolution_for("d1"), Some(Resolution::Ack));
        assert!(seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn same_partition_runs_in_delivery_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(ScriptedRouter {
            seen: seen.clone(),
            fail_on: vec![],
        });

        let outcome = dispatcher
            .process_batch(vec![
                delivery("d1", &QueueMessage::Research { item_id: "abc".into() }),
                delivery("d2", &QueueMessage::Structure { item_id: "abc".into() }),
                delivery("d3", &QueueMessage::Factcheck { item_id: "abc".into() }),
            ])
            .await;

        assert_eq!(outcome.acked(), 3);
        let seen = seen.lock().await;
        assert_eq!(
            seen.iter().map(|m| m.type_name()).collect::<Vec<_>>(),
            vec!["research", "structure", "factcheck"]
        );
    }

    #[tokio::test]
    async fn failure_in_one_partition_leaves_siblings_acked() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::new(ScriptedRouter {
            seen,
            fail_on: vec!["flaky".to_string()],
        });

        let outcome = dispatcher
            .process_batch(vec![
                delivery("d1", &QueueMessage::Publish { item_id: "flaky".into() }),
                delivery("d2", &QueueMessage::Publish { item_id: "steady".into() }),
            ])
            .await;

        assert_eq!(outcome.acked(), 1);
        assert_eq!(outcome.retried(), 1);
        assert_eq!(outcome.resolution_for("d2"), Some(Resolution::Ack));
    }
}
