//! Periodic health checks with persisted results and failure alerts.
//!
//! A [`Heartbeat`] is built from a [`Config`]: every probe type under
//! `monitor` becomes a [`Job`], each cycle runs the jobs in order, stores
//! their results as one batch per job and hands the failures to the
//! channels under `notify`.

pub mod config;
pub mod database;
pub mod error;
pub mod monitoring;
pub mod notify;
pub mod orchestrator;
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use orchestrator::{Heartbeat, HeartbeatBuilder, Job, JobReport};
