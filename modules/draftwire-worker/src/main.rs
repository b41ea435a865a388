use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::ClaudeOracle;
use draftwire_common::{file_config, Config};
use draftwire_discovery::{DiscoveryEngine, Listings};
use draftwire_publish::github::GithubCommitApi;
use draftwire_publish::webhooks::{
    DisabledNewsletter, DisabledSocial, NewsletterWebhook, SocialWebhook,
};
use draftwire_publish::{dispatch_newsletter, staleness_sweep, NewsletterApi, SocialApi};
use draftwire_queue::{Dispatcher, MemoryQueue};
use draftwire_store::MemoryStore;
use draftwire_worker::{triggers::pump_queue, PipelineRouter};
use draftwire_workflow::Orchestrator;
use workspace_client::WorkspaceClient;

const QUEUE_PUMP_SECS: u64 = 5;
const NEWSLETTER_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const STALENESS_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("draftwire=info".parse()?))
        .init();

    info!("Draftwire worker starting...");

    let config = Config::from_env();
    config.log_redacted();

    let sources = file_config::load_sources(Path::new(&config.sources_file))?;
    info!(sources = sources.len(), "Source roster loaded");

    // Single-process wiring: in-memory store and queue stand in for the
    // externally provided ones behind the same trait seams.
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let oracle = Arc::new(ClaudeOracle::new(&config.anthropic_api_key));
    let workspace = Arc::new(WorkspaceClient::new(
        &config.workspace_base_url,
        &config.workspace_token,
        &config.workspace_api_version,
        &config.workspace_database_id,
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        workspace.clone(),
    ));

    let engine = DiscoveryEngine::new(
        store.clone(),
        oracle.clone(),
        Listings::new(&config.youtube_api_key, config.github_token.as_deref()),
        workspace.clone(),
        orchestrator.clone(),
    );

    let commit = Arc::new(GithubCommitApi::new(
        &config.publish_repo,
        &config.publish_token,
    ));
    let social: Arc<dyn SocialApi> = match &config.social_webhook_url {
        Some(url) => Arc::new(SocialWebhook::new(url)),
        None => Arc::new(DisabledSocial),
    };
    let newsletter: Arc<dyn NewsletterApi> = match &config.newsletter_webhook_url {
        Some(url) => Arc::new(NewsletterWebhook::new(url)),
        None => Arc::new(DisabledNewsletter),
    };

    let dispatcher = Dispatcher::new(PipelineRouter::new(
        store.clone(),
        queue.clone(),
        oracle.clone(),
        orchestrator,
        commit,
        social,
    ));

    let mut discovery_tick =
        tokio::time::interval(Duration::from_secs(config.discovery_interval_secs));
    let mut pump_tick = tokio::time::interval(Duration::from_secs(QUEUE_PUMP_SECS));
    let start = tokio::time::Instant::now();
    let mut newsletter_tick = tokio::time::interval_at(
        start + Duration::from_secs(NEWSLETTER_INTERVAL_SECS),
        Duration::from_secs(NEWSLETTER_INTERVAL_SECS),
    );
    let mut staleness_tick = tokio::time::interval_at(
        start + Duration::from_secs(STALENESS_INTERVAL_SECS),
        Duration::from_secs(STALENESS_INTERVAL_SECS),
    );

    loop {
        tokio::select! {
            _ = discovery_tick.tick() => {
                let report = engine.run_all(&sources).await;
                info!(
                    approved = report.approved,
                    errors = report.errors.len(),
                    "Discovery sweep finished"
                );
            }
            _ = pump_tick.tick() => {
                pump_queue(&queue, &dispatcher).await;
            }
            _ = newsletter_tick.tick() => {
                match dispatch_newsletter(&store, &newsletter, chrono::Utc::now()).await {
                    Ok(sent) => info!(sent, "Newsletter trigger finished"),
                    Err(e) => warn!(error = %e, "Newsletter dispatch failed"),
                }
            }
            _ = staleness_tick.tick() => {
                match staleness_sweep(&store, &queue, chrono::Utc::now()).await {
                    Ok(queued) => info!(queued, "Staleness sweep finished"),
                    Err(e) => warn!(error = %e, "Staleness sweep failed"),
                }
            }
        }
    }
}
