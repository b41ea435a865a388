//! The discovery run loop.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::TextOracle;
use draftwire_common::{
    Candidate, DedupRecord, DiscoveryReport, SourceConfig, SourceError, SourceKind, WorkflowError,
    WorkflowInput,
};
use draftwire_queue::WorkQueue;
use draftwire_store::{keys, StateStore};
use draftwire_workflow::{DraftSink, Orchestrator};
use workspace_client::{IntakeRecord, WorkspaceClient};

use crate::scoring;
use crate::sources::{dedup_key, stable_raw_id, SourceListing};

/// Retention window for dedup sightings: 30 days.
pub const DEDUP_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// An item that cleared its source's admission threshold.
#[derive(Debug, Clone)]
pub struct ApprovedItem {
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub score: u32,
    pub category: String,
    pub source_id: String,
}

/// Receives approved items for editorial review.
#[async_trait]
pub trait IntakeSink: Send + Sync {
    async fn record_approved(&self, item: &ApprovedItem) -> Result<()>;
}

#[async_trait]
impl IntakeSink for WorkspaceClient {
    async fn record_approved(&self, item: &ApprovedItem) -> Result<()> {
        self.create_intake_page(&IntakeRecord {
            item_id: item.item_id.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            score: item.score,
            category: item.category.clone(),
            source_id: item.source_id.clone(),
        })
        .await
    }
}

#[async_trait]
impl<I: IntakeSink + ?Sized> IntakeSink for std::sync::Arc<I> {
    async fn record_approved(&self, item: &ApprovedItem) -> Result<()> {
        (**self).record_approved(item).await
    }
}

/// Starts an enhancement workflow for an approved item.
#[async_trait]
pub trait WorkflowStarter: Send + Sync {
    /// Ok(true) when a workflow was created; Ok(false) when one already
    /// exists for the item (already in flight, not an error).
    async fn start_workflow(&self, input: WorkflowInput) -> Result<bool>;
}

#[async_trait]
impl<S, Q, O, D> WorkflowStarter for Orchestrator<S, Q, O, D>
where
    S: StateStore,
    Q: WorkQueue,
    O: TextOracle,
    D: DraftSink,
{
    async fn start_workflow(&self, input: WorkflowInput) -> Result<bool> {
        match self.start(input).await {
            Ok(_) => Ok(true),
            Err(WorkflowError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)),
        }
    }
}

#[async_trait]
impl<W: WorkflowStarter + ?Sized> WorkflowStarter for std::sync::Arc<W> {
    async fn start_workflow(&self, input: WorkflowInput) -> Result<bool> {
        (**self).start_workflow(input).await
    }
}

/// Dedup & scoring engine. Stateless between runs; every sighting lives in
/// the store.
pub struct DiscoveryEngine<S, O, L, I, W> {
    store: S,
    oracle: O,
    listings: L,
    intake: I,
    starter: W,
}

impl<S, O, L, I, W> DiscoveryEngine<S, O, L, I, W>
where
    S: StateStore,
    O: TextOracle,
    L: SourceListing,
    I: IntakeSink,
    W: WorkflowStarter,
{
    pub fn new(store: S, oracle: O, listings: L, intake: I, starter: W) -> Self {
        Self {
            store,
            oracle,
            listings,
            intake,
            starter,
        }
    }

    /// Evaluate every configured source.
    pub async fn run_all(&self, configs: &[SourceConfig]) -> DiscoveryReport {
        self.run(configs.iter()).await
    }

    /// Evaluate only the sources of one kind.
    pub async fn run_one(&self, kind: SourceKind, configs: &[SourceConfig]) -> DiscoveryReport {
        self.run(configs.iter().filter(|c| c.kind == kind)).await
    }

    /// The last run's report, if any run has completed.
    pub async fn last_report(&self) -> Result<Option<DiscoveryReport>> {
        match self.store.get(keys::LAST_REPORT).await? {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).context("decoding last discovery report")?,
            )),
            None => Ok(None),
        }
    }

    async fn run<'a>(
        &self,
        configs: impl Iterator<Item = &'a SourceConfig>,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport {
            run_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        for source in configs {
            report.sources_checked += 1;
            // One failing source never aborts the others.
            if let Err(e) = self.evaluate_source(source, &mut report).await {
                warn!(source = source.id.as_str(), error = %format!("{e:#}"), "Source evaluation failed");
                report.errors.push(SourceError {
                    source_id: source.id.clone(),
                    message: format!("{e:#}"),
                });
            }
        }

        info!(
            sources = report.sources_checked,
            seen = report.items_seen,
            scored = report.items_scored,
            approved = report.approved,
            errors = report.errors.len(),
            "Discovery run complete"
        );

        if let Err(e) = self.persist_report(&report).await {
            warn!(error = %e, "Failed to persist discovery report");
        }
        report
    }

    async fn evaluate_source(
        &self,
        source: &SourceConfig,
        report: &mut DiscoveryReport,
    ) -> Result<()> {
        let candidates = self.listings.recent(source).await?;
        // Zero items is a quiet week, not an error.
        for candidate in candidates {
            report.items_seen += 1;

            let Some(key) = dedup_key(source.kind, &candidate) else {
                warn!(
                    source = source.id.as_str(),
                    title = candidate.title.as_str(),
                    "Candidate has no usable identity, skipping"
                );
                continue;
            };

            // Already evaluated within the retention window.
            if self.store.get(&key).await?.is_some() {
                debug!(key = key.as_str(), "Already seen, skipping");
                continue;
            }

            let score = scoring::score_candidate(&self.oracle, &candidate, &source.category).await;
            report.items_scored += 1;

            // Record the sighting regardless of outcome so rejected items
            // are not re-scored on every sweep.
            let record = DedupRecord {
                title: candidate.title.clone(),
                url: candidate.url.clone(),
                score,
                recorded_at: Utc::now(),
            };
            self.store
                .put(
                    &key,
                    &serde_json::to_string(&record).context("encoding dedup record")?,
                    Some(DEDUP_TTL_SECONDS),
                )
                .await?;

            if score > source.min_score {
                match self.admit(source, &candidate, score).await {
                    Ok(true) => report.approved += 1,
                    Ok(false) => {
                        debug!(
                            title = candidate.title.as_str(),
                            "Workflow already in flight, not counting as approved"
                        );
                    }
                    Err(e) => {
                        warn!(
                            source = source.id.as_str(),
                            title = candidate.title.as_str(),
                            error = %format!("{e:#}"),
                            "Admission failed"
                        );
                        report.errors.push(SourceError {
                            source_id: source.id.clone(),
                            message: format!("admitting {:?}: {e:#}", candidate.title),
                        });
                    }
                }
            } else {
                debug!(
                    title = candidate.title.as_str(),
                    score,
                    min_score = source.min_score,
                    "Below admission threshold"
                );
            }
        }
        Ok(())
    }

    async fn admit(
        &self,
        source: &SourceConfig,
        candidate: &Candidate,
        score: u32,
    ) -> Result<bool> {
        // dedup_key succeeded, so the raw id exists.
        let raw = stable_raw_id(source.kind, candidate)
            .context("admitted candidate lost its stable id")?;
        let item_id = format!("{}-{}", source.kind.name(), raw);

        let approved = ApprovedItem {
            item_id: item_id.clone(),
            title: candidate.title.clone(),
            url: candidate.url.clone(),
            score,
            category: source.category.clone(),
            source_id: source.id.clone(),
        };
        self.intake
            .record_approved(&approved)
            .await
            .context("recording approved item")?;

        let started = self
            .starter
            .start_workflow(WorkflowInput {
                item_id: item_id.clone(),
                title: candidate.title.clone(),
                summary: candidate.summary.clone(),
                url: candidate.url.clone(),
                source_id: source.id.clone(),
                category: source.category.clone(),
                section: source.section.clone(),
                tags: source.tags.clone(),
                featured: source.featured,
            })
            .await
            .context("starting workflow")?;

        if started {
            info!(
                item_id = item_id.as_str(),
                title = candidate.title.as_str(),
                score,
                "Item approved into the pipeline"
            );
        }
        Ok(started)
    }

    async fn persist_report(&self, report: &DiscoveryReport) -> Result<()> {
        let raw = serde_json::to_string(report).context("encoding discovery report")?;
        self.store.put(keys::LAST_REPORT, &raw, None).await
    }
}
