//! The enhancement orchestrator.
//!
//! One control-flow skeleton for every stage: load → verify status →
//! external work → mutate → enqueue/persist. Only the prompt differs per
//! stage (see [`crate::prompts`]).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use ai_client::TextOracle;
use draftwire_common::{
    QueueMessage, Stage, WorkflowError, WorkflowInput, WorkflowResult, WorkflowState,
    WorkflowStatus,
};
use draftwire_queue::WorkQueue;
use draftwire_store::{keys, StateStore};
use workspace_client::{DraftRecord, WorkspaceClient};

use crate::prompts;

/// Receives the finished draft at the end of the pipeline.
#[async_trait]
pub trait DraftSink: Send + Sync {
    async fn push_draft(&self, state: &WorkflowState, body: &str) -> Result<()>;
}

#[async_trait]
impl DraftSink for WorkspaceClient {
    async fn push_draft(&self, state: &WorkflowState, body: &str) -> Result<()> {
        self.create_draft_page(&DraftRecord {
            item_id: state.input.item_id.clone(),
            title: state.input.title.clone(),
            category: state.input.category.clone(),
            body: body.to_string(),
        })
        .await
    }
}

#[async_trait]
impl<D: DraftSink + ?Sized> DraftSink for std::sync::Arc<D> {
    async fn push_draft(&self, state: &WorkflowState, body: &str) -> Result<()> {
        (**self).push_draft(state, body).await
    }
}

/// What a step did with its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The stage ran and the workflow advanced to this status.
    Advanced(WorkflowStatus),
    /// Redelivery of an already-completed stage. Nothing mutated, nothing
    /// enqueued.
    StaleReplay,
    /// The workflow has not reached this stage yet. Nothing mutated.
    OutOfOrder,
}

/// Drives workflows through the fixed stage sequence.
///
/// Holds no state of its own; the store record is the sole source of truth
/// and is reloaded on every call.
pub struct Orchestrator<S, Q, O, D> {
    store: S,
    queue: Q,
    oracle: O,
    drafts: D,
}

impl<S, Q, O, D> Orchestrator<S, Q, O, D>
where
    S: StateStore,
    Q: WorkQueue,
    O: TextOracle,
    D: DraftSink,
{
    pub fn new(store: S, queue: Q, oracle: O, drafts: D) -> Self {
        Self {
            store,
            queue,
            oracle,
            drafts,
        }
    }

    /// Create a workflow for an item and enqueue its first stage.
    ///
    /// Rejects a duplicate item id outright — restarting an in-flight
    /// workflow would silently discard paid-for stage output.
    pub async fn start(&self, input: WorkflowInput) -> WorkflowResult<String> {
        validate_input(&input)?;

        let key = keys::workflow(&input.item_id);
        if self.store.get(&key).await?.is_some() {
            return Err(WorkflowError::AlreadyExists {
                item_id: input.item_id,
            });
        }

        let state = WorkflowState::new(input, Utc::now());
        let item_id = state.input.item_id.clone();
        self.persist(&state).await?;
        self.queue
            .send(QueueMessage::for_stage(Stage::Research, item_id.clone()))
            .await?;

        info!(item_id = item_id.as_str(), "Workflow started");
        Ok(item_id)
    }

    /// Run one stage for one workflow, if the record is waiting on it.
    ///
    /// At-least-once delivery makes duplicates inevitable; the status check
    /// turns them into `StaleReplay`/`OutOfOrder` no-ops instead of
    /// corruption. Failures after the oracle call propagate so the message
    /// retries from the top of the stage — regenerating the stage output on
    /// retry is acceptable, double-advancing is not.
    pub async fn process_step(&self, stage: Stage, item_id: &str) -> WorkflowResult<StepOutcome> {
        let mut state = self
            .load(item_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                item_id: item_id.to_string(),
            })?;

        match state.status.expected_stage() {
            Some(expected) if expected == stage => {}
            _ => {
                return Ok(if state.status.position() > stage.position() {
                    info!(
                        item_id,
                        stage = %stage,
                        status = %state.status,
                        "Stale replay of a completed stage, discarding"
                    );
                    StepOutcome::StaleReplay
                } else {
                    warn!(
                        item_id,
                        stage = %stage,
                        status = %state.status,
                        "Out-of-order stage message, discarding"
                    );
                    StepOutcome::OutOfOrder
                });
            }
        }

        let prompt = prompts::stage_prompt(stage, &state);
        let output = self
            .oracle
            .complete(&prompt, prompts::temperature(stage))
            .await
            .with_context(|| format!("stage {stage} generation for {item_id}"))?;
        if output.trim().is_empty() {
            warn!(item_id, stage = %stage, "Oracle returned empty output, recording as-is");
        }

        state.complete_stage(stage, output, Utc::now())?;

        match stage.next() {
            Some(next) => {
                // Enqueue before persisting: if the persist fails the whole
                // message retries with status unchanged, and the premature
                // next-stage message is dropped as out-of-order. The reverse
                // order would strand the workflow — a persisted advance whose
                // enqueue failed replays as stale and nothing re-sends.
                self.queue
                    .send(QueueMessage::for_stage(next, item_id))
                    .await?;
                self.persist(&state).await?;
            }
            None => {
                let body = state
                    .result_for(Stage::Finalize)
                    .map(|r| r.payload.clone())
                    .ok_or_else(|| anyhow!("finalize result missing after completion"))?;
                self.drafts.push_draft(&state, &body).await?;
                self.persist(&state).await?;
            }
        }

        info!(
            item_id,
            stage = %stage,
            status = %state.status,
            "Stage complete"
        );
        Ok(StepOutcome::Advanced(state.status))
    }

    /// Load a workflow record, distinct not-found signal included.
    pub async fn get(&self, item_id: &str) -> WorkflowResult<WorkflowState> {
        self.load(item_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound {
                item_id: item_id.to_string(),
            })
    }

    async fn load(&self, item_id: &str) -> WorkflowResult<Option<WorkflowState>> {
        let raw = self.store.get(&keys::workflow(item_id)).await?;
        match raw {
            Some(raw) => {
                let state: WorkflowState = serde_json::from_str(&raw)
                    .with_context(|| format!("decoding workflow record for {item_id}"))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn persist(&self, state: &WorkflowState) -> Result<()> {
        let raw = serde_json::to_string(state).context("encoding workflow record")?;
        self.store
            .put(&keys::workflow(state.item_id()), &raw, None)
            .await
    }
}

fn validate_input(input: &WorkflowInput) -> WorkflowResult<()> {
    if input.item_id.trim().is_empty() {
        return Err(WorkflowError::InvalidInput("item_id is required".into()));
    }
    if input.item_id.chars().any(char::is_whitespace) {
        return Err(WorkflowError::InvalidInput(format!(
            "item_id may not contain whitespace: {:?}",
            input.item_id
        )));
    }
    if input.title.trim().is_empty() {
        return Err(WorkflowError::InvalidInput("title is required".into()));
    }
    if input.category.trim().is_empty() {
        return Err(WorkflowError::InvalidInput("category is required".into()));
    }
    Ok(())
}
