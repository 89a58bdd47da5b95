//! Orchestration policy, completion signals and loop outcomes.

mod outcome;
mod policy;
mod signal;

pub use outcome::{DispatchReport, LoopExit, SignalDisposition, TickOutcome};
pub use policy::{
    DEFAULT_LEASE_TTL, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENCY, DEFAULT_POLL_INTERVAL,
    DEFAULT_RETRY_DELAY, OrchestrationPolicy,
};
pub use signal::CompletionSignal;
