//! Payloads exchanged with the Builder and Scheduler actors.

pub mod builder;
pub mod scheduler;
