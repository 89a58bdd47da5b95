//! Plan generator adapters.

pub mod fixed;
pub mod openai;

pub use fixed::FixedPlanGenerator;
pub use openai::OpenAiPlanGenerator;
