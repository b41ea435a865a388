//! Collaborator seams for the publish flows.

use anyhow::Result;
use async_trait::async_trait;

/// One line of the weekly digest.
#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub title: String,
    pub url: String,
}

/// Commits a rendered document to the published site's repository.
#[async_trait]
pub trait CommitApi: Send + Sync {
    /// Create or update the document at `path`. Returns the public URL of
    /// the committed page.
    async fn commit_document(&self, path: &str, message: &str, content: &str) -> Result<String>;
}

/// Announces a published item on social channels.
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn announce(&self, title: &str, url: &str) -> Result<()>;
}

/// Sends the weekly digest.
#[async_trait]
pub trait NewsletterApi: Send + Sync {
    async fn send_digest(&self, subject: &str, entries: &[DigestEntry]) -> Result<()>;
}

#[async_trait]
impl<C: CommitApi + ?Sized> CommitApi for std::sync::Arc<C> {
    async fn commit_document(&self, path: &str, message: &str, content: &str) -> Result<String> {
        (**self).commit_document(path, message, content).await
    }
}

#[async_trait]
impl<S: SocialApi + ?Sized> SocialApi for std::sync::Arc<S> {
    async fn announce(&self, title: &str, url: &str) -> Result<()> {
        (**self).announce(title, url).await
    }
}

#[async_trait]
impl<N: NewsletterApi + ?Sized> NewsletterApi for std::sync::Arc<N> {
    async fn send_digest(&self, subject: &str, entries: &[DigestEntry]) -> Result<()> {
        (**self).send_digest(subject, entries).await
    }
}
