//! Weekly digest of freshly published items.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use draftwire_store::{keys, StateStore};

use crate::stages::load_marker;
use crate::traits::{DigestEntry, NewsletterApi};

/// Items published within this many days make the digest.
pub const DIGEST_WINDOW_DAYS: i64 = 7;

/// Collect the week's publishes and send the digest. Returns how many
/// entries went out; a quiet week sends nothing.
pub async fn dispatch_newsletter<S, N>(
    store: &S,
    newsletter: &N,
    now: DateTime<Utc>,
) -> Result<usize>
where
    S: StateStore,
    N: NewsletterApi,
{
    let cutoff = now - Duration::days(DIGEST_WINDOW_DAYS);
    let mut entries = Vec::new();

    for key in store.list(keys::PUBLISHED_PREFIX).await? {
        let item_id = key.trim_start_matches(keys::PUBLISHED_PREFIX);
        if let Some(marker) = load_marker(store, item_id).await? {
            if marker.published_at > cutoff {
                entries.push((marker.published_at, DigestEntry {
                    title: marker.title,
                    url: marker.url,
                }));
            }
        }
    }

    if entries.is_empty() {
        info!("No publishes this week, skipping digest");
        return Ok(0);
    }

    entries.sort_by_key(|(published_at, _)| std::cmp::Reverse(*published_at));
    let entries: Vec<DigestEntry> = entries.into_iter().map(|(_, e)| e).collect();

    let subject = format!("This week's articles ({})", now.format("%Y-%m-%d"));
    newsletter.send_digest(&subject, &entries).await?;

    info!(count = entries.len(), "Digest sent");
    Ok(entries.len())
}
