//! Webhook-backed social and newsletter collaborators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::traits::{DigestEntry, NewsletterApi, SocialApi};

async fn post_json(http: &reqwest::Client, url: &str, payload: serde_json::Value) -> Result<()> {
    debug!(url, "Webhook post");
    let response = http.post(url).json(&payload).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("webhook failed ({status}): {body}"));
    }
    Ok(())
}

/// Cross-post announcements via a webhook.
pub struct SocialWebhook {
    http: reqwest::Client,
    url: String,
}

impl SocialWebhook {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SocialApi for SocialWebhook {
    async fn announce(&self, title: &str, url: &str) -> Result<()> {
        post_json(
            &self.http,
            &self.url,
            json!({ "text": format!("New article: {title}\n{url}") }),
        )
        .await
    }
}

/// Stand-in when no social webhook is configured. Announcing is a logged
/// no-op rather than an error, so crosspost messages still resolve.
pub struct DisabledSocial;

#[async_trait]
impl SocialApi for DisabledSocial {
    async fn announce(&self, title: &str, _url: &str) -> Result<()> {
        tracing::info!(title, "Social cross-posting disabled, skipping announce");
        Ok(())
    }
}

/// Weekly digest dispatch via a webhook.
pub struct NewsletterWebhook {
    http: reqwest::Client,
    url: String,
}

impl NewsletterWebhook {
    pub fn new(url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl NewsletterApi for NewsletterWebhook {
    async fn send_digest(&self, subject: &str, entries: &[DigestEntry]) -> Result<()> {
        let items: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| json!({ "title": e.title, "url": e.url }))
            .collect();
        post_json(
            &self.http,
            &self.url,
            json!({ "subject": subject, "items": items }),
        )
        .await
    }
}

/// Stand-in when no newsletter webhook is configured.
pub struct DisabledNewsletter;

#[async_trait]
impl NewsletterApi for DisabledNewsletter {
    async fn send_digest(&self, subject: &str, entries: &[DigestEntry]) -> Result<()> {
        tracing::info!(
            subject,
            entries = entries.len(),
            "Newsletter dispatch disabled, skipping digest"
        );
        Ok(())
    }
}
