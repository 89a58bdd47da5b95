//! Port contracts for execution agents.

mod agent;

#[cfg(test)]
pub(crate) use agent::MockExecutionAgent;
pub use agent::{AgentError, AgentResult, ExecutionAgent};
