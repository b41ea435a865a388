// Thin client for the review workspace database.
//
// The pipeline's only obligation is to send a well-formed record; responses
// are interpreted as success/failure and nothing more.

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use tracing::debug;

/// An approved discovery item headed for editorial review.
#[derive(Debug, Clone)]
pub struct IntakeRecord {
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub score: u32,
    pub category: String,
    pub source_id: String,
}

/// A stage-final draft pushed for review.
#[derive(Debug, Clone)]
pub struct DraftRecord {
    pub item_id: String,
    pub title: String,
    pub category: String,
    pub body: String,
}

pub struct WorkspaceClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    api_version: String,
    database_id: String,
}

impl WorkspaceClient {
    pub fn new(base_url: &str, token: &str, api_version: &str, database_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            api_version: api_version.to_string(),
            database_id: database_id.to_string(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))?,
        );
        headers.insert(
            "Notion-Version",
            HeaderValue::from_str(&self.api_version)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Create an intake page for an approved item.
    pub async fn create_intake_page(&self, record: &IntakeRecord) -> Result<()> {
        let payload = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Title": { "title": [{ "text": { "content": record.title } }] },
                "Item ID": { "rich_text": [{ "text": { "content": record.item_id } }] },
                "URL": { "url": record.url },
                "Score": { "number": record.score },
                "Category": { "select": { "name": record.category } },
                "Source": { "rich_text": [{ "text": { "content": record.source_id } }] },
                "Status": { "select": { "name": "Discovered" } }
            }
        });
        self.create_page(payload).await
    }

    /// Create a draft page carrying the finished document body.
    pub async fn create_draft_page(&self, record: &DraftRecord) -> Result<()> {
        let children: Vec<serde_json::Value> = paragraphs(&record.body)
            .into_iter()
            .map(|text| {
                json!({
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": {
                        "rich_text": [{ "type": "text", "text": { "content": text } }]
                    }
                })
            })
            .collect();

        let payload = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                "Title": { "title": [{ "text": { "content": record.title } }] },
                "Item ID": { "rich_text": [{ "text": { "content": record.item_id } }] },
                "Category": { "select": { "name": record.category } },
                "Status": { "select": { "name": "Draft Ready" } }
            },
            "children": children
        });
        self.create_page(payload).await
    }

    async fn create_page(&self, payload: serde_json::Value) -> Result<()> {
        let url = format!("{}/pages", self.base_url);
        debug!(url = url.as_str(), "Workspace page create");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("workspace API error ({status}): {body}"));
        }
        Ok(())
    }
}

// Paragraph blocks cap out at 2000 characters of rich text; split on blank
// lines and hard-wrap any oversized paragraph.
const MAX_BLOCK_CHARS: usize = 2000;

fn paragraphs(body: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    for para in body.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let mut rest = para.trim();
        while rest.chars().count() > MAX_BLOCK_CHARS {
            let split_at = rest
                .char_indices()
                .nth(MAX_BLOCK_CHARS)
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            blocks.push(rest[..split_at].to_string());
            rest = &rest[split_at..];
        }
        blocks.push(rest.to_string());
    }
    blocks
}
