//! Commit collaborator backed by the GitHub contents API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::traits::CommitApi;

const GITHUB_API_URL: &str = "https://api.github.com";
const CLIENT_UA: &str = "draftwire/0.1";

/// Commits documents to `owner/repo` via the contents API. Updates fetch
/// the existing blob sha first; the PUT is idempotent for identical
/// content, which keeps retried publish messages safe.
pub struct GithubCommitApi {
    http: reqwest::Client,
    repo: String,
    token: String,
    base_url: String,
}

impl GithubCommitApi {
    pub fn new(repo: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            repo: repo.to_string(),
            token: token.to_string(),
            base_url: GITHUB_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn existing_sha(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, CLIENT_UA)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                #[derive(Deserialize)]
                struct Existing {
                    sha: String,
                }
                let existing: Existing = response.json().await?;
                Ok(Some(existing.sha))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("contents lookup failed ({status}): {body}"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: Option<PutContent>,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    html_url: Option<String>,
}

#[async_trait]
impl CommitApi for GithubCommitApi {
    async fn commit_document(&self, path: &str, message: &str, content: &str) -> Result<String> {
        let url = format!("{}/repos/{}/contents/{}", self.base_url, self.repo, path);

        let sha = self
            .existing_sha(&url)
            .await
            .context("checking for existing document")?;
        debug!(path, update = sha.is_some(), "Committing document");

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .http
            .put(&url)
            .header(USER_AGENT, CLIENT_UA)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("commit failed ({status}): {body}"));
        }

        let put: PutResponse = response.json().await?;
        Ok(put
            .content
            .and_then(|c| c.html_url)
            .unwrap_or_else(|| format!("https://github.com/{}/blob/main/{path}", self.repo)))
    }
}
