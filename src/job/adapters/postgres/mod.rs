//! `PostgreSQL` adapters for job, task and event persistence.

mod models;
mod schema;
mod store;

pub use store::{JobPgPool, PostgresJobStore};
