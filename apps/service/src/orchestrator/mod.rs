/// Orchestrator module - drives the heartbeat cycle
///
/// The orchestrator:
/// - Builds one [`Job`] per configured probe type, in declaration order
/// - Runs the jobs one after another each cycle
/// - Waits the configured interval between cycles, forever
///
/// A failing job is logged and the cycle moves on to the next one; only
/// construction errors stop the service.

pub mod builder;
pub mod job;


pub use builder::HeartbeatBuilder;
pub use job::{Job, JobReport};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::Config;

/// Pause primitive used between cycles
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Totals for one pass over every job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub completed: usize,
    pub failed: usize,
    pub results: usize,
}

/// The heartbeat scheduler
pub struct Heartbeat {
    jobs: Vec<Job>,
    interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl Heartbeat {
    /// Start building a heartbeat from configuration
    pub fn builder(config: Config) -> HeartbeatBuilder {
        HeartbeatBuilder::new(config)
    }

    pub fn new(jobs: Vec<Job>, interval: Duration, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { jobs, interval, sleeper }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run every job once, in order
    pub async fn run_cycle(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();

        for job in &self.jobs {
            match job.run().await {
                Ok(report) => {
                    summary.completed += 1;
                    summary.results += report.total;
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Job {} failed: {}", job.name(), e);
                }
            }
        }

        summary
    }

    /// Alternate between running a cycle and sleeping, forever
    pub async fn run(&self) {
        info!(
            "Starting heartbeat: {} jobs, interval {}ms",
            self.jobs.len(),
            self.interval.as_millis()
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let summary = self.run_cycle().await;
            info!(
                "Cycle {} complete: {} jobs ok, {} failed, {} results",
                cycle, summary.completed, summary.failed, summary.results
            );

            self.sleeper.sleep(self.interval).await;
        }
    }

    /// Spawn the loop on the runtime
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
