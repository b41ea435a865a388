//! Source listing adapters.
//!
//! Each adapter turns one source kind's native listing API into a uniform
//! `Vec<Candidate>`, newest first, bounded to one page. The engine never
//! sees a provider-specific shape.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use draftwire_common::{Candidate, SourceConfig, SourceKind};
use draftwire_store::keys;

/// Upper bound on candidates taken from any one listing.
pub const PAGE_LIMIT: usize = 50;

/// How far back the video listing looks.
const VIDEO_LOOKBACK_DAYS: i64 = 7;

const CLIENT_UA: &str = "draftwire/0.1";

/// Fetches the recent candidates for a configured source.
#[async_trait]
pub trait SourceListing: Send + Sync {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>>;
}

#[async_trait]
impl<L: SourceListing + ?Sized> SourceListing for std::sync::Arc<L> {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        (**self).recent(source).await
    }
}

/// Derive the store key that identifies one sighting of a candidate.
///
/// Kind-namespaced so identical native ids from different source kinds can
/// never collide. Feed entries key on the SHA-256 of their canonical link;
/// the other kinds key on the native id, falling back to the link hash when
/// the id is missing or blank. Returns None when the candidate has no
/// usable identity at all.
pub fn dedup_key(kind: SourceKind, candidate: &Candidate) -> Option<String> {
    let raw = stable_raw_id(kind, candidate)?;
    Some(keys::seen(kind.name(), &raw))
}

/// The raw stable id used both for dedup keys and workflow item ids.
pub fn stable_raw_id(kind: SourceKind, candidate: &Candidate) -> Option<String> {
    let link = canonical_link(&candidate.url);
    match kind {
        SourceKind::Feed => link.map(|l| keys::link_hash(&l)),
        _ => match candidate.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Some(id.to_string()),
            _ => link.map(|l| keys::link_hash(&l)),
        },
    }
}

fn canonical_link(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Url::parse normalizes scheme/host case and default ports; an
    // unparseable link still identifies the item as-is.
    Some(
        Url::parse(trimmed)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| trimmed.to_string()),
    )
}

// ---------------------------------------------------------------------------
// Video platform (channel uploads)
// ---------------------------------------------------------------------------

const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Lists a channel's uploads from the last week, newest first.
pub struct VideoChannelListing {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VideoChannelListing {
    pub fn new(api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: YOUTUBE_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct VideoSearchResponse {
    #[serde(default)]
    items: Vec<VideoSearchItem>,
}

#[derive(Debug, Deserialize)]
struct VideoSearchItem {
    id: VideoId,
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
struct VideoId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl SourceListing for VideoChannelListing {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        let published_after = (Utc::now() - Duration::days(VIDEO_LOOKBACK_DAYS)).to_rfc3339();
        let url = format!("{}/search", self.base_url);

        debug!(channel = source.id.as_str(), "Video listing fetch");
        let response: VideoSearchResponse = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("channelId", source.id.as_str()),
                ("order", "date"),
                ("type", "video"),
                ("maxResults", "50"),
                ("publishedAfter", published_after.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()
            .context("video listing request")?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .take(PAGE_LIMIT)
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(Candidate {
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    external_id: Some(video_id),
                    title: item.snippet.title,
                    summary: item.snippet.description,
                })
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// RSS/Atom feed
// ---------------------------------------------------------------------------

/// Lists a feed's entries. Entries have no native id worth trusting; dedup
/// keys on the canonical link.
pub struct FeedListing {
    http: reqwest::Client,
}

impl FeedListing {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for FeedListing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceListing for FeedListing {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        debug!(feed = source.id.as_str(), "Feed fetch");
        let bytes = self
            .http
            .get(&source.id)
            .header(USER_AGENT, CLIENT_UA)
            .send()
            .await?
            .error_for_status()
            .context("feed request")?
            .bytes()
            .await?;

        let feed = feed_rs::parser::parse(&bytes[..]).context("parsing feed")?;

        Ok(feed
            .entries
            .into_iter()
            .take(PAGE_LIMIT)
            .map(|entry| Candidate {
                external_id: None,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                summary: entry.summary.map(|s| s.content).unwrap_or_default(),
                url: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Source-control releases
// ---------------------------------------------------------------------------

const GITHUB_API_URL: &str = "https://api.github.com";

/// Lists a repository's recent releases. Source id is `owner/repo`.
pub struct ReleaseListing {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl ReleaseListing {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.map(String::from),
            base_url: GITHUB_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    html_url: String,
}

#[async_trait]
impl SourceListing for ReleaseListing {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        let url = format!("{}/repos/{}/releases", self.base_url, source.id);

        debug!(repo = source.id.as_str(), "Release listing fetch");
        let mut request = self
            .http
            .get(&url)
            .header(USER_AGENT, CLIENT_UA)
            .query(&[("per_page", "30")]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let releases: Vec<Release> = request
            .send()
            .await?
            .error_for_status()
            .context("release listing request")?
            .json()
            .await?;

        Ok(releases
            .into_iter()
            .take(PAGE_LIMIT)
            .map(|release| Candidate {
                external_id: Some(release.id.to_string()),
                title: release
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("{} {}", source.id, release.tag_name)),
                summary: release.body.unwrap_or_default(),
                url: release.html_url,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Link-aggregator stories
// ---------------------------------------------------------------------------

const AGGREGATOR_API_URL: &str = "https://hn.algolia.com/api/v1";

/// Lists recent aggregator stories matching the source's query.
pub struct StoryListing {
    http: reqwest::Client,
    base_url: String,
}

impl StoryListing {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: AGGREGATOR_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

impl Default for StoryListing {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct StorySearchResponse {
    #[serde(default)]
    hits: Vec<StoryHit>,
}

#[derive(Debug, Deserialize)]
struct StoryHit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    story_text: Option<String>,
}

#[async_trait]
impl SourceListing for StoryListing {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        let url = format!("{}/search_by_date", self.base_url);

        debug!(query = source.id.as_str(), "Story listing fetch");
        let response: StorySearchResponse = self
            .http
            .get(&url)
            .header(USER_AGENT, CLIENT_UA)
            .query(&[
                ("tags", "story"),
                ("query", source.id.as_str()),
                ("hitsPerPage", "50"),
            ])
            .send()
            .await?
            .error_for_status()
            .context("story listing request")?
            .json()
            .await?;

        Ok(response
            .hits
            .into_iter()
            .take(PAGE_LIMIT)
            .map(|hit| Candidate {
                url: hit.url.unwrap_or_else(|| {
                    format!("https://news.ycombinator.com/item?id={}", hit.object_id)
                }),
                external_id: Some(hit.object_id),
                title: hit.title.unwrap_or_default(),
                summary: hit.story_text.unwrap_or_default(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Kind-keyed bundle
// ---------------------------------------------------------------------------

/// One adapter per source kind, dispatched by the config's kind.
pub struct Listings {
    video: VideoChannelListing,
    feed: FeedListing,
    releases: ReleaseListing,
    stories: StoryListing,
}

impl Listings {
    pub fn new(youtube_api_key: &str, github_token: Option<&str>) -> Self {
        Self {
            video: VideoChannelListing::new(youtube_api_key),
            feed: FeedListing::new(),
            releases: ReleaseListing::new(github_token),
            stories: StoryListing::new(),
        }
    }
}

#[async_trait]
impl SourceListing for Listings {
    async fn recent(&self, source: &SourceConfig) -> Result<Vec<Candidate>> {
        match source.kind {
            SourceKind::Video => self.video.recent(source).await,
            SourceKind::Feed => self.feed.recent(source).await,
            SourceKind::Releases => self.releases.recent(source).await,
            SourceKind::Stories => self.stories.recent(source).await,
        }
    }
}
