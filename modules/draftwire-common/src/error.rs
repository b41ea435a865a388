//! Typed errors for workflow operations.

use thiserror::Error;

/// Errors surfaced by the workflow orchestrator.
///
/// `AlreadyExists` and `InvalidInput` reject a `start` call before any state
/// is created. `NotFound` is the distinct signal for a step whose workflow
/// record is missing. `InvalidTransition` is raised by the state's single
/// mutation point; the orchestrator maps stale and out-of-order deliveries
/// to non-error outcomes before it can occur.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A workflow already exists for this item id.
    #[error("workflow already exists: {item_id}")]
    AlreadyExists { item_id: String },

    /// No workflow record found for this item id.
    #[error("no workflow found: {item_id}")]
    NotFound { item_id: String },

    /// Missing or malformed required input; no state created.
    #[error("invalid workflow input: {0}")]
    InvalidInput(String),

    /// Attempted status transition not present in the transition table.
    #[error("cannot complete stage {stage} from status {from}")]
    InvalidTransition {
        from: &'static str,
        stage: &'static str,
    },

    /// Store, queue, or collaborator failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
