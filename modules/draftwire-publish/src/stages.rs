//! Queue-triggered stage handlers for publish, crosspost, and refresh.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use ai_client::TextOracle;
use draftwire_common::{
    PublishedMarker, QueueMessage, Stage, WorkflowState, WorkflowStatus,
};
use draftwire_queue::WorkQueue;
use draftwire_store::{keys, StateStore};

use crate::render;
use crate::traits::{CommitApi, SocialApi};

/// How a stage handler resolved its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The side effect happened.
    Done,
    /// Stale or out-of-order delivery; dropped without side effects.
    Skipped,
}

/// Publish a draft-ready workflow: render, commit, mark published, and
/// queue a crosspost for featured items.
pub async fn handle_publish<S, Q, C>(
    store: &S,
    queue: &Q,
    commit: &C,
    item_id: &str,
) -> Result<Disposition>
where
    S: StateStore,
    Q: WorkQueue,
    C: CommitApi,
{
    let Some(state) = load_workflow(store, item_id).await? else {
        warn!(item_id, "Publish for unknown workflow, discarding");
        return Ok(Disposition::Skipped);
    };
    if state.status != WorkflowStatus::DraftReady {
        warn!(
            item_id,
            status = %state.status,
            "Publish before draft is ready, discarding"
        );
        return Ok(Disposition::Skipped);
    }
    if store.get(&keys::published(item_id)).await?.is_some() {
        info!(item_id, "Already published, discarding redelivery");
        return Ok(Disposition::Skipped);
    }

    let path = render::document_path(&state);
    let doc = render::render_document(&state);
    let url = commit
        .commit_document(&path, &format!("Publish: {}", state.input.title), &doc)
        .await
        .context("committing published document")?;

    // Queue the crosspost before writing the marker: a failed marker write
    // retries the whole message, and the early crosspost blocks until the
    // marker exists. The reverse order can drop the crosspost for good.
    if state.input.featured {
        queue
            .send(QueueMessage::Crosspost {
                item_id: item_id.to_string(),
            })
            .await?;
    }

    let marker = PublishedMarker {
        item_id: item_id.to_string(),
        title: state.input.title.clone(),
        url,
        content_path: path,
        published_at: Utc::now(),
        refreshed_at: None,
    };
    put_marker(store, &marker).await?;

    info!(
        item_id,
        url = marker.url.as_str(),
        featured = state.input.featured,
        "Published"
    );
    Ok(Disposition::Done)
}

/// Announce a published item. Retries until the published marker exists —
/// crossposts are only ever queued by a publish in progress.
pub async fn handle_crosspost<S, A>(store: &S, social: &A, item_id: &str) -> Result<Disposition>
where
    S: StateStore,
    A: SocialApi,
{
    let Some(marker) = load_marker(store, item_id).await? else {
        bail!("crosspost for {item_id} before its published marker exists");
    };

    social
        .announce(&marker.title, &marker.url)
        .await
        .context("announcing on social channels")?;

    info!(item_id, "Crossposted");
    Ok(Disposition::Done)
}

const REFRESH_TEMPERATURE: f32 = 0.3;

/// Regenerate a stale published document against the current date and
/// commit the update. Stage results stay append-only; the refreshed body
/// goes straight to the site.
pub async fn handle_refresh<S, O, C>(
    store: &S,
    oracle: &O,
    commit: &C,
    item_id: &str,
) -> Result<Disposition>
where
    S: StateStore,
    O: TextOracle,
    C: CommitApi,
{
    let Some(marker) = load_marker(store, item_id).await? else {
        warn!(item_id, "Refresh for an unpublished item, discarding");
        return Ok(Disposition::Skipped);
    };
    let Some(state) = load_workflow(store, item_id).await? else {
        warn!(item_id, "Refresh for unknown workflow, discarding");
        return Ok(Disposition::Skipped);
    };

    let current = state
        .result_for(Stage::Finalize)
        .map(|r| r.payload.as_str())
        .unwrap_or_default();
    let prompt = refresh_prompt(&state, current);
    let updated = oracle
        .complete(&prompt, REFRESH_TEMPERATURE)
        .await
        .context("refresh generation")?;
    if updated.trim().is_empty() {
        warn!(item_id, "Refresh produced no content, keeping the old document");
        return Ok(Disposition::Skipped);
    }

    let doc = render::render_with_body(&state, &updated);
    commit
        .commit_document(
            &marker.content_path,
            &format!("Refresh: {}", state.input.title),
            &doc,
        )
        .await
        .context("committing refreshed document")?;

    let marker = PublishedMarker {
        refreshed_at: Some(Utc::now()),
        ..marker
    };
    put_marker(store, &marker).await?;

    info!(item_id, "Refreshed");
    Ok(Disposition::Done)
}

fn refresh_prompt(state: &WorkflowState, current: &str) -> String {
    format!(
        "This article was published some time ago. Today's date is {today}. \
         Update it: fix anything outdated, refresh version numbers and links you \
         are confident about, and leave everything still accurate untouched. \
         Return the full updated article body in markdown.\n\n\
         Title: {title}\n\n{current}",
        today = Utc::now().format("%Y-%m-%d"),
        title = state.input.title,
        current = current,
    )
}

pub(crate) async fn load_workflow<S: StateStore>(
    store: &S,
    item_id: &str,
) -> Result<Option<WorkflowState>> {
    match store.get(&keys::workflow(item_id)).await? {
        Some(raw) => Ok(Some(
            serde_json::from_str(&raw)
                .with_context(|| format!("decoding workflow record for {item_id}"))?,
        )),
        None => Ok(None),
    }
}

pub(crate) async fn load_marker<S: StateStore>(
    store: &S,
    item_id: &str,
) -> Result<Option<PublishedMarker>> {
    match store.get(&keys::published(item_id)).await? {
        Some(raw) => Ok(Some(
            serde_json::from_str(&raw)
                .with_context(|| format!("decoding published marker for {item_id}"))?,
        )),
        None => Ok(None),
    }
}

pub(crate) async fn put_marker<S: StateStore>(store: &S, marker: &PublishedMarker) -> Result<()> {
    let raw = serde_json::to_string(marker).context("encoding published marker")?;
    store
        .put(&keys::published(&marker.item_id), &raw, None)
        .await
}
