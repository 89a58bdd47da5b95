//! Conductor: plans a goal into a task DAG and drives it to completion.
//!
//! A submitted goal is decomposed by a generative planner into phases of
//! role-tagged tasks with dependencies. The orchestration loop then promotes
//! tasks whose dependencies succeeded, hands them to an external execution
//! agent within a concurrency ceiling, retries failed attempts, and settles
//! the job once every task is terminal.
//!
//! # Architecture
//!
//! Each bounded context follows a hexagonal layout:
//!
//! - **Domain**: pure types and lifecycle rules
//! - **Ports**: trait interfaces for external systems
//! - **Adapters**: concrete implementations (`PostgreSQL`, HTTP clients,
//!   in-memory doubles)
//! - **Services**: orchestration of domain and ports
//!
//! # Modules
//!
//! - [`job`]: jobs, tasks, audit events and their persistence
//! - [`planner`]: goal decomposition and identifier remapping
//! - [`agent`]: launching tasks on the execution agent
//! - [`source_control`]: best-effort branch and pull request creation
//! - [`orchestration`]: resolver, dispatcher, completion handler and loop
//! - [`api`]: JSON HTTP surface
//! - [`config`]: environment configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod agent;
pub mod api;
pub mod config;
pub mod job;
pub mod orchestration;
pub mod planner;
pub mod source_control;
pub mod telemetry;
