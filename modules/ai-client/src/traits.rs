use anyhow::Result;
use async_trait::async_trait;

/// Generative-text oracle: one prompt in, free text out.
///
/// The pipeline treats the oracle as a black box that may return malformed
/// or empty text; callers degrade with deterministic fallbacks rather than
/// crash. Mock implementations script responses for deterministic tests.
#[async_trait]
pub trait TextOracle: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

// Implemented for Arc<O> so the oracle can be shared across components.
#[async_trait]
impl<O: TextOracle + ?Sized> TextOracle for std::sync::Arc<O> {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).complete(prompt, temperature).await
    }
}
