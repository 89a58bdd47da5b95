//! JSON HTTP surface over the job service.
//!
//! Handlers depend on the object-safe [`JobApi`] facade rather than on a
//! concrete service, so one router serves every store and adapter
//! combination the binary can assemble.

mod error;
mod facade;
mod handlers;
mod payload;

#[cfg(test)]
mod tests;

pub use error::{ApiError, ApiResult};
pub use facade::JobApi;
pub use handlers::router;
pub use payload::{
    AgentWebhookBody, EventListResponse, FailJobBody, JobListQuery, JobListResponse, JobResponse,
    SubmitJobBody, TaskListResponse, WebhookAck,
};
