//! Shared domain types for the draftwire pipeline.
//!
//! `WorkflowState` is the sole source of truth for a content item's journey
//! through the enhancement stages. It lives in the key/value store and is
//! reloaded on every queue message; nothing in memory survives between
//! invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowError;

// ---------------------------------------------------------------------------
// Stages and workflow status
// ---------------------------------------------------------------------------

/// One discrete step of the enhancement pipeline, in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Structure,
    Factcheck,
    Finalize,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Research,
        Stage::Structure,
        Stage::Factcheck,
        Stage::Finalize,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Structure => "structure",
            Stage::Factcheck => "factcheck",
            Stage::Finalize => "finalize",
        }
    }

    /// The stage that follows this one, or None for the last stage.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Research => Some(Stage::Structure),
            Stage::Structure => Some(Stage::Factcheck),
            Stage::Factcheck => Some(Stage::Finalize),
            Stage::Finalize => None,
        }
    }

    /// Zero-based position in the pipeline, for stale/out-of-order checks.
    pub fn position(&self) -> usize {
        match self {
            Stage::Research => 0,
            Stage::Structure => 1,
            Stage::Factcheck => 2,
            Stage::Finalize => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Workflow lifecycle status. Always equals the next stage to run, or
/// `DraftReady` once all stages are done. Forward-only; the transition
/// table in [`WorkflowState::complete_stage`] is the single mutation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Researching,
    Structuring,
    Factchecking,
    Finalizing,
    DraftReady,
}

impl WorkflowStatus {
    /// The stage this status is waiting on. None once the draft is ready.
    pub fn expected_stage(&self) -> Option<Stage> {
        match self {
            WorkflowStatus::Researching => Some(Stage::Research),
            WorkflowStatus::Structuring => Some(Stage::Structure),
            WorkflowStatus::Factchecking => Some(Stage::Factcheck),
            WorkflowStatus::Finalizing => Some(Stage::Finalize),
            WorkflowStatus::DraftReady => None,
        }
    }

    /// The status reached after completing `stage`. Defined only for the
    /// status that is actually waiting on `stage` — everything else is an
    /// invalid transition.
    fn after(stage: Stage) -> WorkflowStatus {
        match stage {
            Stage::Research => WorkflowStatus::Structuring,
            Stage::Structure => WorkflowStatus::Factchecking,
            Stage::Factcheck => WorkflowStatus::Finalizing,
            Stage::Finalize => WorkflowStatus::DraftReady,
        }
    }

    /// Position on the pipeline axis: completed-stage count.
    pub fn position(&self) -> usize {
        match self {
            WorkflowStatus::Researching => 0,
            WorkflowStatus::Structuring => 1,
            WorkflowStatus::Factchecking => 2,
            WorkflowStatus::Finalizing => 3,
            WorkflowStatus::DraftReady => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStatus::Researching => "researching",
            WorkflowStatus::Structuring => "structuring",
            WorkflowStatus::Factchecking => "factchecking",
            WorkflowStatus::Finalizing => "finalizing",
            WorkflowStatus::DraftReady => "draft_ready",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::DraftReady)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Workflow state
// ---------------------------------------------------------------------------

/// Immutable fields captured when a workflow starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// Stable item identifier; doubles as the workflow id.
    pub item_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    /// Identifier of the source config that admitted this item.
    pub source_id: String,
    pub category: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Featured items get cross-posted after publish.
    #[serde(default)]
    pub featured: bool,
}

/// Output of one completed stage. Append-only once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub payload: String,
    pub completed_at: DateTime<Utc>,
}

/// Per-item workflow record, persisted after every transition.
///
/// Invariant: `stage_results` holds exactly the completed stages in pipeline
/// order, and `status` names the next stage to run (or `DraftReady`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub status: WorkflowStatus,
    pub input: WorkflowInput,
    pub stage_results: Vec<StageResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(input: WorkflowInput, now: DateTime<Utc>) -> Self {
        Self {
            status: WorkflowStatus::Researching,
            input,
            stage_results: Vec::new(),
            started_at: now,
            completed_at: None,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.input.item_id
    }

    /// The recorded result for a stage, if it has completed.
    pub fn result_for(&self, stage: Stage) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage == stage)
    }

    /// Record a completed stage and advance the status.
    ///
    /// This is the only place the status moves. Rejects any stage that is
    /// not the one the current status is waiting on, so replayed or
    /// out-of-order messages can never corrupt the record.
    pub fn complete_stage(
        &mut self,
        stage: Stage,
        payload: String,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status.expected_stage() != Some(stage) {
            return Err(WorkflowError::InvalidTransition {
                from: self.status.name(),
                stage: stage.name(),
            });
        }
        self.stage_results.push(StageResult {
            stage,
            payload,
            completed_at: now,
        });
        self.status = WorkflowStatus::after(stage);
        if self.status.is_terminal() {
            self.completed_at = Some(now);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Discovery types
// ---------------------------------------------------------------------------

/// The kind of external source a config points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Video platform channel (native video ids).
    Video,
    /// RSS/Atom feed (link-derived ids).
    Feed,
    /// Source-control releases (native release ids).
    Releases,
    /// Link-aggregator stories (native story ids).
    Stories,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Feed => "feed",
            SourceKind::Releases => "releases",
            SourceKind::Stories => "stories",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One monitored source. Externally configured, read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Native identifier: channel id, feed URL, `owner/repo`, or query tag.
    pub id: String,
    pub kind: SourceKind,
    /// Minimum relevance score; an item is admitted only when its score is
    /// strictly greater than this.
    pub min_score: u32,
    pub category: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

/// A candidate item adapted from a source listing, before scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Native id from the source, when the source has one.
    pub external_id: Option<String>,
    pub title: String,
    pub summary: String,
    pub url: String,
}

/// Persisted sighting of a discovered item. Expires after the retention
/// window; a re-sighting after expiry is a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupRecord {
    pub title: String,
    pub url: String,
    pub score: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Per-source failure recorded in a discovery run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceError {
    pub source_id: String,
    pub message: String,
}

/// Summary of one discovery run. The last report is persisted under a
/// well-known key for status inspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub run_id: Option<Uuid>,
    pub sources_checked: u32,
    pub items_seen: u32,
    pub items_scored: u32,
    pub approved: u32,
    pub errors: Vec<SourceError>,
}

// ---------------------------------------------------------------------------
// Queue messages
// ---------------------------------------------------------------------------

/// Typed queue message. Closed set; dispatch is an exhaustive match.
///
/// Envelopes whose `type` tag is outside this set fail to decode and are
/// acknowledged without action at the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueMessage {
    Research { item_id: String },
    Structure { item_id: String },
    Factcheck { item_id: String },
    Finalize { item_id: String },
    Publish { item_id: String },
    Refresh { item_id: String },
    Crosspost { item_id: String },
}

impl QueueMessage {
    /// Build the message that triggers `stage` for `item_id`.
    pub fn for_stage(stage: Stage, item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        match stage {
            Stage::Research => QueueMessage::Research { item_id },
            Stage::Structure => QueueMessage::Structure { item_id },
            Stage::Factcheck => QueueMessage::Factcheck { item_id },
            Stage::Finalize => QueueMessage::Finalize { item_id },
        }
    }

    /// The enhancement stage this message drives, for stage messages.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            QueueMessage::Research { .. } => Some(Stage::Research),
            QueueMessage::Structure { .. } => Some(Stage::Structure),
            QueueMessage::Factcheck { .. } => Some(Stage::Factcheck),
            QueueMessage::Finalize { .. } => Some(Stage::Finalize),
            _ => None,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            QueueMessage::Research { item_id }
            | QueueMessage::Structure { item_id }
            | QueueMessage::Factcheck { item_id }
            | QueueMessage::Finalize { item_id }
            | QueueMessage::Publish { item_id }
            | QueueMessage::Refresh { item_id }
            | QueueMessage::Crosspost { item_id } => item_id,
        }
    }

    /// Partition key for per-workflow serialization. Messages sharing a key
    /// must never be processed concurrently.
    pub fn partition_key(&self) -> &str {
        self.item_id()
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            QueueMessage::Research { .. } => "research",
            QueueMessage::Structure { .. } => "structure",
            QueueMessage::Factcheck { .. } => "factcheck",
            QueueMessage::Finalize { .. } => "finalize",
            QueueMessage::Publish { .. } => "publish",
            QueueMessage::Refresh { .. } => "refresh",
            QueueMessage::Crosspost { .. } => "crosspost",
        }
    }
}

// ---------------------------------------------------------------------------
// Publish bookkeeping
// ---------------------------------------------------------------------------

/// Marker written when an item is published. Listed by prefix for the
/// newsletter digest and the staleness sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedMarker {
    pub item_id: String,
    pub title: String,
    pub url: String,
    /// Repository path the rendered document was committed to.
    pub content_path: String,
    pub published_at: DateTime<Utc>,
    pub refreshed_at: Option<DateTime<Utc>>,
}
