//! Monthly staleness sweep: queue a refresh for every published item that
//! has gone too long without one.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use draftwire_common::QueueMessage;
use draftwire_queue::WorkQueue;
use draftwire_store::{keys, StateStore};

use crate::stages::load_marker;

/// Days since publish (or last refresh) before an item counts as stale.
pub const STALENESS_WINDOW_DAYS: i64 = 90;

/// Enqueue one refresh message per stale item. Returns how many were
/// queued. Redundant refreshes are harmless — the handler regenerates the
/// same document — so the sweep itself needs no dedup.
pub async fn staleness_sweep<S, Q>(store: &S, queue: &Q, now: DateTime<Utc>) -> Result<usize>
where
    S: StateStore,
    Q: WorkQueue,
{
    let cutoff = now - Duration::days(STALENESS_WINDOW_DAYS);
    let mut queued = 0usize;

    for key in store.list(keys::PUBLISHED_PREFIX).await? {
        let item_id = key.trim_start_matches(keys::PUBLISHED_PREFIX);
        let Some(marker) = load_marker(store, item_id).await? else {
            continue;
        };
        let freshest = marker.refreshed_at.unwrap_or(marker.published_at);
        if freshest <= cutoff {
            queue
                .send(QueueMessage::Refresh {
                    item_id: marker.item_id,
                })
                .await?;
            queued += 1;
        }
    }

    info!(queued, "Staleness sweep complete");
    Ok(queued)
}
