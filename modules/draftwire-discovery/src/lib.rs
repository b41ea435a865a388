// Discovery: fetch candidates per source, dedup against prior sightings,
// score with the oracle, admit past-threshold items into the pipeline.
//
// Idempotency lives in the store: one DedupRecord per (kind, stable id),
// written on first sighting regardless of outcome, so overlapping runs
// never re-score or re-approve the same item.

pub mod engine;
pub mod scoring;
pub mod sources;

pub use engine::{
    ApprovedItem, DiscoveryEngine, IntakeSink, WorkflowStarter, DEDUP_TTL_SECONDS,
};
pub use sources::{dedup_key, Listings, SourceListing};
