// StateStore — the one shared mutable resource in the pipeline.
//
// Injected everywhere, never ambient: every component that persists state
// takes a store handle, so tests swap in MemoryStore and deterministic
// runs need no external services.

pub mod keys;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::MemoryStore;

/// Durable string-to-string mapping with optional TTL and list-by-prefix.
///
/// The store has no transactions; the read-modify-write of a workflow
/// record per step is the atomicity boundary. Callers serialize access per
/// workflow id at the dispatch layer.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value. None when the key is absent or its TTL has lapsed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, optionally expiring after `ttl_seconds`.
    async fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;

    /// List all live keys with the given prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

// Implemented for Arc<S> so one store can be shared across components.
#[async_trait]
impl<S: StateStore + ?Sized> StateStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        (**self).put(key, value, ttl_seconds).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }
}
