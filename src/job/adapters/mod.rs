//! Adapter implementations for the job store port.

pub mod memory;
pub mod postgres;
