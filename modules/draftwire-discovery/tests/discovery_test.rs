//! Discovery engine tests over in-memory infrastructure, with the real
//! orchestrator as the workflow starter.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use ai_client::TextOracle;
use draftwire_common::{Candidate, DedupRecord, SourceConfig, SourceKind};
use draftwire_discovery::{ApprovedItem, DiscoveryEngine, IntakeSink, SourceListing};
use draftwire_queue::MemoryQueue;
use draftwire_store::{keys, MemoryStore, StateStore};
use draftwire_workflow::testing::{MockOracle, RecordingDraftSink};
use draftwire_workflow::Orchestrator;

/// Oracle that always answers with the same text.
struct ConstOracle(&'static str);

#[async_trait]
impl TextOracle for ConstOracle {
    async fn complete(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Listing scripted per source id; ids in `failing` error out.
#[derive(Default)]
struct ScriptedListing {
    by_source: HashMap<String, Vec<Candidate>>,
    failing: Vec<String>,
}

impl ScriptedListing {
    fn with(mut self, source_id: &str, candidates: Vec<Candidate>) -> Self {
        self.by_source.insert(source_id.to_string(), candidates);
        self
    }

    fn failing(mut self, source_id: &str) -> Self {
        self.failing.push(source_id.to_string());
        self
    }
}

#[async_trait]
impl SourceListing for ScriptedListing {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        if self.failing.iter().any(|id| id == &source.id) {
            bail!("listing API unavailable");
        }
        Ok(self.by_source.get(&source.id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct RecordingIntake {
    items: Mutex<Vec<ApprovedItem>>,
}

impl RecordingIntake {
    async fn items(&self) -> Vec<ApprovedItem> {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl IntakeSink for RecordingIntake {
    async fn record_approved(&self, item: &ApprovedItem) -> Result<()> {
        self.items.lock().await.push(item.clone());
        Ok(())
    }
}

fn candidate(external_id: Option<&str>, title: &str, url: &str) -> Candidate {
    Candidate {
        external_id: external_id.map(String::from),
        title: title.to_string(),
        summary: format!("summary of {title}"),
        url: url.to_string(),
    }
}

fn source(id: &str, kind: SourceKind, min_score: u32) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        kind,
        min_score,
        category: "DevOps".to_string(),
        section: "tooling".to_string(),
        tags: vec!["ci".to_string()],
        featured: false,
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    queue: Arc<MemoryQueue>,
    intake: Arc<RecordingIntake>,
}

type Starter =
    Orchestrator<Arc<MemoryStore>, Arc<MemoryQueue>, Arc<MockOracle>, Arc<RecordingDraftSink>>;

fn harness() -> Harness {
    Harness {
        store: Arc::new(MemoryStore::new()),
        queue: Arc::new(MemoryQueue::new()),
        intake: Arc::new(RecordingIntake::default()),
    }
}

impl Harness {
    fn starter(&self) -> Starter {
        Orchestrator::new(
            self.store.clone(),
            self.queue.clone(),
            Arc::new(MockOracle::new()),
            Arc::new(RecordingDraftSink::new()),
        )
    }

    fn engine<O: TextOracle>(
        &self,
        oracle: O,
        listing: ScriptedListing,
    ) -> DiscoveryEngine<Arc<MemoryStore>, O, ScriptedListing, Arc<RecordingIntake>, Starter> {
        DiscoveryEngine::new(
            self.store.clone(),
            oracle,
            listing,
            self.intake.clone(),
            self.starter(),
        )
    }
}

#[tokio::test]
async fn second_run_over_unchanged_source_approves_nothing() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "chan-1",
        vec![
            candidate(Some("v1"), "First video", "https://example.com/v1"),
            candidate(Some("v2"), "Second video", "https://example.com/v2"),
        ],
    );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![source("chan-1", SourceKind::Video, 70)];

    let first = engine.run_all(&configs).await;
    assert_eq!(first.items_scored, 2);
    assert_eq!(first.approved, 2);

    let second = engine.run_all(&configs).await;
    assert_eq!(second.items_seen, 2);
    assert_eq!(second.items_scored, 0, "seen items must not be re-scored");
    assert_eq!(second.approved, 0, "seen items must not be re-approved");
    assert_eq!(h.intake.items().await.len(), 2);
}

#[tokio::test]
async fn same_native_id_across_kinds_produces_distinct_records() {
    let h = harness();
    let listing = ScriptedListing::default()
        .with(
            "chan-1",
            vec![candidate(Some("12345"), "A video", "https://example.com/v")],
        )
        .with(
            "rust",
            vec![candidate(Some("12345"), "A story", "https://example.com/s")],
        );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![
        source("chan-1", SourceKind::Video, 70),
        source("rust", SourceKind::Stories, 70),
    ];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.items_scored, 2, "no cross-kind collision");
    assert_eq!(report.approved, 2);

    assert_eq!(h.store.list("seen:video:").await.unwrap().len(), 1);
    assert_eq!(h.store.list("seen:stories:").await.unwrap().len(), 1);

    let item_ids: Vec<String> = h
        .intake
        .items()
        .await
        .into_iter()
        .map(|i| i.item_id)
        .collect();
    assert!(item_ids.contains(&"video-12345".to_string()));
    assert!(item_ids.contains(&"stories-12345".to_string()));
}

#[tokio::test]
async fn unparseable_oracle_response_records_default_score() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "feed-1",
        vec![candidate(None, "A post", "https://example.com/post")],
    );
    let engine = h.engine(ConstOracle("hard to say, really"), listing);
    let configs = vec![source("feed-1", SourceKind::Feed, 70)];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.items_scored, 1);
    assert_eq!(report.approved, 0, "default 50 stays below threshold 70");

    let key = &h.store.list("seen:feed:").await.unwrap()[0];
    let record: DedupRecord =
        serde_json::from_str(&h.store.get(key).await.unwrap().unwrap()).unwrap();
    assert_eq!(record.score, 50);
}

#[tokio::test]
async fn admission_is_strictly_greater_than_threshold() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "chan-1",
        vec![
            candidate(Some("v1"), "Just over", "https://example.com/v1"),
            candidate(Some("v2"), "Just under", "https://example.com/v2"),
            candidate(Some("v3"), "Exactly at", "https://example.com/v3"),
        ],
    );
    let oracle = MockOracle::with_responses(vec!["81", "79", "80"]);
    let engine = h.engine(oracle, listing);
    let configs = vec![source("chan-1", SourceKind::Video, 80)];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.items_scored, 3);
    assert_eq!(report.approved, 1);
    let items = h.intake.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Just over");
    assert_eq!(items[0].score, 81);
}

#[tokio::test]
async fn feed_entries_sharing_a_link_deduplicate_to_one_record() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "feed-1",
        vec![
            candidate(None, "Original title", "https://example.com/post"),
            candidate(None, "Edited title", "https://example.com/post"),
        ],
    );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![source("feed-1", SourceKind::Feed, 70)];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.items_seen, 2);
    assert_eq!(report.items_scored, 1, "link-derived key wins over title");
    assert_eq!(h.store.list("seen:feed:").await.unwrap().len(), 1);

    let record: DedupRecord = serde_json::from_str(
        &h.store
            .get(&h.store.list("seen:feed:").await.unwrap()[0])
            .await
            .unwrap()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(record.title, "Original title");
}

#[tokio::test]
async fn one_failing_source_never_aborts_the_others() {
    let h = harness();
    let listing = ScriptedListing::default()
        .failing("broken-feed")
        .with(
            "chan-1",
            vec![candidate(Some("v1"), "Fine", "https://example.com/v1")],
        );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![
        source("broken-feed", SourceKind::Feed, 70),
        source("chan-1", SourceKind::Video, 70),
    ];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.sources_checked, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].source_id, "broken-feed");
    assert_eq!(report.approved, 1);
}

#[tokio::test]
async fn empty_source_is_not_an_error() {
    let h = harness();
    let engine = h.engine(ConstOracle("90"), ScriptedListing::default());
    let configs = vec![source("quiet-feed", SourceKind::Feed, 70)];

    let report = engine.run_all(&configs).await;
    assert_eq!(report.sources_checked, 1);
    assert_eq!(report.items_seen, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn last_report_is_persisted_under_the_well_known_key() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "chan-1",
        vec![candidate(Some("v1"), "A video", "https://example.com/v1")],
    );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![source("chan-1", SourceKind::Video, 70)];

    let report = engine.run_all(&configs).await;
    assert!(h.store.get(keys::LAST_REPORT).await.unwrap().is_some());

    let loaded = engine.last_report().await.unwrap().unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.approved, 1);
}

#[tokio::test]
async fn run_one_only_touches_the_requested_kind() {
    let h = harness();
    let listing = ScriptedListing::default()
        .with(
            "chan-1",
            vec![candidate(Some("v1"), "A video", "https://example.com/v1")],
        )
        .with(
            "feed-1",
            vec![candidate(None, "A post", "https://example.com/post")],
        );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![
        source("chan-1", SourceKind::Video, 70),
        source("feed-1", SourceKind::Feed, 70),
    ];

    let report = engine.run_one(SourceKind::Feed, &configs).await;
    assert_eq!(report.sources_checked, 1);
    assert_eq!(report.approved, 1);
    assert!(h.store.list("seen:video:").await.unwrap().is_empty());
}

#[tokio::test]
async fn approved_item_starts_a_workflow_with_one_research_message() {
    let h = harness();
    let listing = ScriptedListing::default().with(
        "chan-1",
        vec![candidate(Some("v1"), "A video", "https://example.com/v1")],
    );
    let engine = h.engine(ConstOracle("90"), listing);
    let configs = vec![source("chan-1", SourceKind::Video, 70)];

    engine.run_all(&configs).await;

    let workflows = h.store.list("workflow:").await.unwrap();
    assert_eq!(workflows, vec!["workflow:video-v1".to_string()]);
    let pending = h.queue.pending_messages().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].item_id(), "video-v1");
    assert_eq!(pending[0].type_name(), "research");
}
