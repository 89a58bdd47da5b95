//! Orchestration services: resolver, dispatcher, completion handling, the
//! per-job loop and the job service facade.

mod completion;
mod dispatcher;
mod error;
mod job_service;
mod locks;
mod orchestrator;
mod resolver;

pub use completion::CompletionHandler;
pub use dispatcher::Dispatcher;
pub use error::{OrchestrationError, OrchestrationResult};
pub use job_service::{JobService, JobServiceError, JobServiceResult, RunningJob, SubmitJobRequest};
pub use locks::TaskLocks;
pub use orchestrator::Orchestrator;
pub use resolver::compute_ready;
