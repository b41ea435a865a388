//! The concrete message router behind the dispatcher.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use ai_client::TextOracle;
use draftwire_common::{QueueMessage, Stage, WorkflowError};
use draftwire_publish::{handle_crosspost, handle_publish, handle_refresh, CommitApi, SocialApi};
use draftwire_queue::{MessageRouter, WorkQueue};
use draftwire_store::StateStore;
use draftwire_workflow::{DraftSink, Orchestrator};

/// Routes every queue message kind to its handler. Exhaustive over
/// [`QueueMessage`]; adding a message kind breaks the build here until it
/// gets a handler.
pub struct PipelineRouter<S, Q, O, D, C, A> {
    store: S,
    queue: Q,
    oracle: O,
    orchestrator: Arc<Orchestrator<S, Q, O, D>>,
    commit: C,
    social: A,
}

impl<S, Q, O, D, C, A> PipelineRouter<S, Q, O, D, C, A>
where
    S: StateStore,
    Q: WorkQueue,
    O: TextOracle,
    D: DraftSink,
    C: CommitApi,
    A: SocialApi,
{
    pub fn new(
        store: S,
        queue: Q,
        oracle: O,
        orchestrator: Arc<Orchestrator<S, Q, O, D>>,
        commit: C,
        social: A,
    ) -> Self {
        Self {
            store,
            queue,
            oracle,
            orchestrator,
            commit,
            social,
        }
    }

    async fn step(&self, stage: Stage, item_id: &str) -> Result<()> {
        match self.orchestrator.process_step(stage, item_id).await {
            // Advanced, stale, and out-of-order all resolve the message.
            Ok(_) => Ok(()),
            // No workflow record: retrying cannot conjure one.
            Err(WorkflowError::NotFound { .. }) => {
                warn!(item_id, stage = %stage, "Stage message for unknown workflow, dropping");
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e)),
        }
    }
}

#[async_trait]
impl<S, Q, O, D, C, A> MessageRouter for PipelineRouter<S, Q, O, D, C, A>
where
    S: StateStore,
    Q: WorkQueue,
    O: TextOracle,
    D: DraftSink,
    C: CommitApi,
    A: SocialApi,
{
    async fn route(&self, message: QueueMessage) -> Result<()> {
        match message {
            QueueMessage::Research { item_id } => self.step(Stage::Research, &item_id).await,
            QueueMessage::Structure { item_id } => self.step(Stage::Structure, &item_id).await,
            QueueMessage::Factcheck { item_id } => self.step(Stage::Factcheck, &item_id).await,
            QueueMessage::Finalize { item_id } => self.step(Stage::Finalize, &item_id).await,
            QueueMessage::Publish { item_id } => {
                handle_publish(&self.store, &self.queue, &self.commit, &item_id).await?;
                Ok(())
            }
            QueueMessage::Crosspost { item_id } => {
                handle_crosspost(&self.store, &self.social, &item_id).await?;
                Ok(())
            }
            QueueMessage::Refresh { item_id } => {
                handle_refresh(&self.store, &self.oracle, &self.commit, &item_id).await?;
                Ok(())
            }
        }
    }
}
