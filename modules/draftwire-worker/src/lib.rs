// Worker wiring: the concrete message router and the trigger loop helpers
// the binary runs. Kept as a library so the full pipeline is testable
// end-to-end without a process boundary.

pub mod router;
pub mod triggers;

pub use router::PipelineRouter;
