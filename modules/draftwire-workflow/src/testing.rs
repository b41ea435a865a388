//! Mock collaborators for deterministic tests: no network, no external
//! services, `cargo test` in seconds.

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use ai_client::TextOracle;
use draftwire_common::WorkflowState;

use crate::orchestrator::DraftSink;

/// Scripted [`TextOracle`]. Responses are consumed in order; once the
/// script runs out, every call returns the default text. Records prompts
/// for assertions.
pub struct MockOracle {
    responses: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn with_responses(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// An oracle whose every call fails, for retry-path tests.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Prompts seen so far.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextOracle for MockOracle {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        self.calls.lock().await.push(prompt.to_string());
        if self.fail {
            bail!("oracle unavailable");
        }
        Ok(self
            .responses
            .lock()
            .await
            .pop()
            .unwrap_or_else(|| "generated output".to_string()))
    }
}

/// One captured draft push.
#[derive(Debug, Clone)]
pub struct PushedDraft {
    pub item_id: String,
    pub title: String,
    pub body: String,
}

/// [`DraftSink`] that records pushes for assertions.
#[derive(Default)]
pub struct RecordingDraftSink {
    drafts: Mutex<Vec<PushedDraft>>,
}

impl RecordingDraftSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drafts(&self) -> Vec<PushedDraft> {
        self.drafts.lock().await.clone()
    }
}

#[async_trait]
impl DraftSink for RecordingDraftSink {
    async fn push_draft(&self, state: &WorkflowState, body: &str) -> Result<()> {
        self.drafts.lock().await.push(PushedDraft {
            item_id: state.input.item_id.clone(),
            title: state.input.title.clone(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// [`DraftSink`] that always fails, for downstream-retry tests.
pub struct FailingDraftSink;

#[async_trait]
impl DraftSink for FailingDraftSink {
    async fn push_draft(&self, _state: &WorkflowState, _body: &str) -> Result<()> {
        bail!("workspace unavailable")
    }
}
