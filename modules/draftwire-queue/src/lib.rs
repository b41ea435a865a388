// Work queue contract and dispatch.
//
// The queue is an external collaborator with at-least-once delivery. The
// core only requires: `send` for producers, and batch delivery where every
// message is resolved exactly once — acknowledged or retried, never both,
// never neither. The Dispatcher enforces that totality.
//
// Per-workflow ordering: the queue must partition deliveries by the
// message's partition key across invocations; within a batch the Dispatcher
// serializes deliveries that share a key. See DESIGN.md.

pub mod dispatch;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use draftwire_common::QueueMessage;

pub use dispatch::{BatchOutcome, Dispatcher, MessageRouter, Resolution, RETRY_DELAY_SECONDS};
pub use memory::MemoryQueue;

/// Producer side of the work queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn send(&self, message: QueueMessage) -> Result<()>;
}

// Implemented for Arc<Q> so the queue handle can be shared for assertions.
#[async_trait]
impl<Q: WorkQueue + ?Sized> WorkQueue for std::sync::Arc<Q> {
    async fn send(&self, message: QueueMessage) -> Result<()> {
        (**self).send(message).await
    }
}

/// One delivered envelope. The body is raw JSON so that unknown message
/// types can be detected (and acknowledged) at the dispatch boundary
/// instead of poisoning the whole batch.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub body: serde_json::Value,
    /// Delivery attempt count, starting at 1.
    pub attempts: u32,
}

impl Delivery {
    pub fn new(id: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            body,
            attempts: 1,
        }
    }
}
