//! Key namespacing for the shared store.
//!
//! Every record class gets its own prefix, and dedup keys carry the source
//! kind so identical native ids from different kinds can never collide.

use sha2::{Digest, Sha256};

/// Workflow record for a content item.
pub fn workflow(item_id: &str) -> String {
    format!("workflow:{item_id}")
}

/// Dedup sighting for a source kind + stable raw identifier.
pub fn seen(kind: &str, raw_id: &str) -> String {
    format!("seen:{kind}:{raw_id}")
}

/// Published marker for a content item.
pub fn published(item_id: &str) -> String {
    format!("published:{item_id}")
}

/// Prefix for listing all published markers.
pub const PUBLISHED_PREFIX: &str = "published:";

/// Well-known key holding the last discovery run report.
pub const LAST_REPORT: &str = "discovery:last_report";

/// SHA-256 of a canonical link, hex-encoded. Used as the stable id for
/// feed entries, which have no native identifier.
pub fn link_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_namespace_the_dedup_key() {
        assert_ne!(seen("video", "12345"), seen("stories", "12345"));
    }

    #[test]
    fn link_hash_is_stable_and_link_sensitive() {
        let a = link_hash("https://example.com/post");
        let b = link_hash("https://example.com/post");
        let c = link_hash("https://example.com/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
