//! Full pipeline: discovery → stage messages → draft → publish →
//! crosspost, all over in-memory infrastructure and scripted collaborators.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use ai_client::TextOracle;
use draftwire_common::{
    Candidate, QueueMessage, SourceConfig, SourceKind, Stage, WorkflowStatus,
};
use draftwire_discovery::{ApprovedItem, DiscoveryEngine, IntakeSink, SourceListing};
use draftwire_publish::{CommitApi, SocialApi};
use draftwire_queue::{Dispatcher, MemoryQueue, WorkQueue};
use draftwire_store::MemoryStore;
use draftwire_workflow::testing::RecordingDraftSink;
use draftwire_workflow::Orchestrator;
use draftwire_worker::triggers::pump_queue;
use draftwire_worker::PipelineRouter;

struct ConstOracle(&'static str);

#[async_trait]
impl TextOracle for ConstOracle {
    async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct OneItemListing;

#[async_trait]
impl SourceListing for OneItemListing {
    async fn recent(&self, _source: &SourceConfig) -> Result<Vec<Candidate>> {
        Ok(vec![Candidate {
            external_id: Some("v1".to_string()),
            title: "A featured video".to_string(),
            summary: "worth writing about".to_string(),
            url: "https://example.com/v1".to_string(),
        }])
    }
}

#[derive(Default)]
struct NullIntake;

#[async_trait]
impl IntakeSink for NullIntake {
    async fn record_approved(&self, _item: &ApprovedItem) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingCommit {
    paths: Mutex<Vec<String>>,
}

#[async_trait]
impl CommitApi for RecordingCommit {
    async fn commit_document(&self, path: &str, _message: &str, _content: &str) -> Result<String> {
        self.paths.lock().await.push(path.to_string());
        Ok(format!("https://example.com/site/{path}"))
    }
}

#[derive(Default)]
struct RecordingSocial {
    posts: Mutex<Vec<String>>,
}

#[async_trait]
impl SocialApi for RecordingSocial {
    async fn announce(&self, title: &str, _url: &str) -> Result<()> {
        self.posts.lock().await.push(title.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn discovered_item_flows_to_published_and_crossposted() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let oracle = Arc::new(ConstOracle("90"));
    let drafts = Arc::new(RecordingDraftSink::new());
    let commit = Arc::new(RecordingCommit::default());
    let social = Arc::new(RecordingSocial::default());

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        drafts.clone(),
    ));
    let engine = DiscoveryEngine::new(
        store.clone(),
        oracle.clone(),
        OneItemListing,
        Arc::new(NullIntake),
        orchestrator.clone(),
    );
    let dispatcher = Dispatcher::new(PipelineRouter::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        orchestrator.clone(),
        commit.clone(),
        social.clone(),
    ));

    let sources = vec![SourceConfig {
        id: "chan-1".to_string(),
        kind: SourceKind::Video,
        min_score: 70,
        category: "DevOps".to_string(),
        section: "tooling".to_string(),
        tags: vec![],
        featured: true,
    }];

    let report = engine.run_all(&sources).await;
    assert_eq!(report.approved, 1);

    // Drain the stage chain: research → structure → factcheck → finalize.
    for _ in 0..4 {
        assert_eq!(pump_queue(&queue, &dispatcher).await, 1);
    }
    assert!(queue.is_empty().await);

    let state = orchestrator.get("video-v1").await.unwrap();
    assert_eq!(state.status, WorkflowStatus::DraftReady);
    assert_eq!(drafts.drafts().await.len(), 1);

    // The external surface asks for a publish once review signs off.
    queue
        .send(QueueMessage::Publish {
            item_id: "video-v1".to_string(),
        })
        .await
        .unwrap();
    pump_queue(&queue, &dispatcher).await;

    assert_eq!(commit.paths.lock().await.len(), 1);

    // Featured item: the publish queued a crosspost.
    assert_eq!(pump_queue(&queue, &dispatcher).await, 1);
    assert_eq!(
        *social.posts.lock().await,
        vec!["A featured video".to_string()]
    );
    assert!(queue.is_empty().await);
}

#[tokio::test]
async fn duplicate_stage_messages_in_one_batch_cannot_double_advance() {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let oracle = Arc::new(ConstOracle("output"));
    let drafts = Arc::new(RecordingDraftSink::new());

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        drafts.clone(),
    ));
    let dispatcher = Dispatcher::new(PipelineRouter::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        orchestrator.clone(),
        Arc::new(RecordingCommit::default()),
        Arc::new(RecordingSocial::default()),
    ));

    orchestrator
        .start(draftwire_common::WorkflowInput {
            item_id: "abc".to_string(),
            title: "Title".to_string(),
            summary: String::new(),
            url: String::new(),
            source_id: "src".to_string(),
            category: "DevOps".to_string(),
            section: String::new(),
            tags: vec![],
            featured: false,
        })
        .await
        .unwrap();

    // At-least-once delivery: the research message arrives twice in the
    // same batch. Same partition key, so they run sequentially and the
    // second is a stale replay.
    queue
        .send(QueueMessage::Research {
            item_id: "abc".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(pump_queue(&queue, &dispatcher).await, 2);

    let state = orchestrator.get("abc").await.unwrap();
    assert_eq!(state.status, WorkflowStatus::Structuring);
    assert_eq!(state.stage_results.len(), 1, "no lost update, no double append");

    // Exactly one structure message came out of the pair.
    let pending = queue.pending_messages().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].stage(), Some(Stage::Structure));
}
