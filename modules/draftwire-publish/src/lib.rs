// Terminal and cyclical stages: publish, crosspost, refresh, plus the
// weekly digest and monthly staleness sweep.
//
// Handler bodies are collaborator-thin; what matters here is the queue
// contract: a collaborator failure propagates so the dispatcher retries
// the message, while stale or out-of-order deliveries resolve to no-ops.

pub mod github;
pub mod newsletter;
pub mod render;
pub mod stages;
pub mod sweep;
pub mod traits;
pub mod webhooks;

pub use newsletter::dispatch_newsletter;
pub use stages::{handle_crosspost, handle_publish, handle_refresh, Disposition};
pub use sweep::staleness_sweep;
pub use traits::{CommitApi, DigestEntry, NewsletterApi, SocialApi};
