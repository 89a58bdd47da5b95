//! Execution agent adapters.

pub mod http;
pub mod scripted;

pub use http::HttpExecutionAgent;
pub use scripted::ScriptedAgent;
