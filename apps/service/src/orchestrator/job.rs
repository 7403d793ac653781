use futures::FutureExt;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::ResultSink;
use crate::error::{JobError, ProbeError};
use crate::monitoring::{CheckResult, Probe, ProbeExecutor, ProbeKind};
use crate::notify::Dispatcher;

/// Outcome of one successful job run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: String,
    /// Results persisted (fan-out probes count once per address)
    pub total: usize,
    pub failed: usize,
    /// Notifier invocations made for the failures
    pub notified: usize,
}

/// All configured probes of one kind
pub struct Job {
    kind: ProbeKind,
    probes: Vec<Probe>,
    executor: Arc<ProbeExecutor>,
    sink: Arc<dyn ResultSink>,
    dispatcher: Arc<Dispatcher>,
}

impl Job {
    pub fn new(
        kind: ProbeKind,
        probes: Vec<Probe>,
        executor: Arc<ProbeExecutor>,
        sink: Arc<dyn ResultSink>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self { kind, probes, executor, sink, dispatcher }
    }

    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    /// Run every probe concurrently, persist the results as one batch and
    /// dispatch the failures.
    ///
    /// Nothing is persisted or sent if any probe task dies; nothing is sent
    /// if persisting fails.
    pub async fn run(&self) -> Result<JobReport, JobError> {
        let tasks = self.probes.iter().cloned().map(|probe| {
            let executor = self.executor.clone();
            let target = probe.target();
            tokio::spawn(async move { executor.execute(&probe).await })
                .map(|joined| joined.map_err(|source| ProbeError::Task { target, source }))
        });

        let results: Vec<CheckResult> = try_join_all(tasks).await?.into_iter().flatten().collect();

        for result in &results {
            match result.message() {
                _ if result.is_success() => debug!("{} {} is up", self.name(), result.target),
                Some(message) => warn!("{} {} failed: {}", self.name(), result.target, message),
                None => warn!("{} {} returned an unexpected body", self.name(), result.target),
            }
        }

        self.sink.insert(&results).await.map_err(JobError::Persist)?;

        let failures: Vec<CheckResult> = results.iter().filter(|r| !r.is_success()).cloned().collect();
        let notified = self.dispatcher.dispatch(&failures).await?;

        let report = JobReport {
            job: self.name().to_string(),
            total: results.len(),
            failed: failures.len(),
            notified,
        };
        info!(
            "Job {} finished: {} results, {} failed, {} notifications",
            report.job, report.total, report.failed, report.notified
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::probe::{HttpOptions, ResolveOptions};
    use crate::notify::Notifier;
    use crate::notify::channel::EmailOptions;
    use crate::testing::{
        FakeDriver, FakeHttp, FakePinger, FakeResolver, MemorySink, RecordingMailer,
    };

    struct Fixture {
        sink: Arc<MemorySink>,
        mailer: Arc<RecordingMailer>,
    }

    fn http(url: &str) -> Probe {
        Probe::Http(HttpOptions { url: url.into() })
    }

    fn build(kind: ProbeKind, probes: Vec<Probe>, sink: MemorySink, mailer: RecordingMailer) -> (Job, Fixture) {
        let http = FakeHttp::default()
            .route("http://up.test/", 200, "")
            .route("http://down.test/", 503, "");
        let executor = Arc::new(ProbeExecutor::new(
            Arc::new(http),
            Arc::new(FakeResolver::default().record("pool.test", &["10.0.0.1", "10.0.0.2", "10.0.0.3"])),
            Arc::new(FakePinger::reachable(&["10.0.0.1", "10.0.0.2"])),
            Arc::new(FakeDriver::default()),
        ));
        let sink = Arc::new(sink);
        let mailer = Arc::new(mailer);
        let dispatcher = Arc::new(Dispatcher::new(vec![Notifier::Email {
            options: EmailOptions {
                from: "monitor@example.com".into(),
                to: vec!["ops@example.com".into()],
                server_token: None,
            },
            transport: mailer.clone(),
        }]));

        let job = Job::new(kind, probes, executor, sink.clone(), dispatcher);
        (job, Fixture { sink, mailer })
    }

    #[tokio::test]
    async fn test_single_batch_and_failures_only() {
        let (job, fixture) = build(
            ProbeKind::Http,
            vec![http("http://up.test/"), http("http://down.test/")],
            MemorySink::default(),
            RecordingMailer::default(),
        );

        let report = job.run().await.unwrap();

        assert_eq!(report, JobReport { job: "http".into(), total: 2, failed: 1, notified: 1 });
        let batches = fixture.sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);

        let sent = fixture.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("http://down.test/"));
    }

    #[tokio::test]
    async fn test_fan_out_results_are_flattened() {
        let (job, fixture) = build(
            ProbeKind::Resolve,
            vec![
                Probe::Resolve(ResolveOptions { name: "pool.test".into() }),
                Probe::Resolve(ResolveOptions { name: "gone.test".into() }),
            ],
            MemorySink::default(),
            RecordingMailer::default(),
        );

        let report = job.run().await.unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.failed, 2);
        let targets: Vec<String> =
            fixture.sink.batches()[0].iter().map(|r| r.target.clone()).collect();
        assert_eq!(targets, ["10.0.0.1", "10.0.0.2", "10.0.0.3", "gone.test"]);
    }

    #[tokio::test]
    async fn test_no_failures_still_dispatches_nothing() {
        let (job, fixture) = build(
            ProbeKind::Http,
            vec![http("http://up.test/")],
            MemorySink::default(),
            RecordingMailer::default(),
        );

        let report = job.run().await.unwrap();

        assert_eq!(report.failed, 0);
        assert_eq!(report.notified, 0);
        assert!(fixture.mailer.sent().is_empty());
        assert_eq!(fixture.sink.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_skips_notification() {
        let (job, fixture) = build(
            ProbeKind::Http,
            vec![http("http://down.test/")],
            MemorySink::failing(),
            RecordingMailer::default(),
        );

        let error = job.run().await.unwrap_err();

        assert!(matches!(error, JobError::Persist(_)));
        assert_eq!(fixture.sink.attempts(), 1);
        assert!(fixture.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_aborts_job() {
        let (job, fixture) = build(
            ProbeKind::Http,
            vec![http("http://down.test/")],
            MemorySink::default(),
            RecordingMailer::failing(),
        );

        let error = job.run().await.unwrap_err();

        assert!(matches!(error, JobError::Notify(_)));
        assert_eq!(fixture.sink.batches().len(), 1);
    }

    #[tokio::test]
    async fn test_probe_task_failure_aborts_before_persisting() {
        let (job, fixture) = build(
            ProbeKind::Http,
            vec![http("http://up.test/"), http("http://panic.test/")],
            MemorySink::default(),
            RecordingMailer::default(),
        );

        let error = job.run().await.unwrap_err();

        assert!(matches!(
            error,
            JobError::Probe(ProbeError::Task { ref target, .. }) if target == "http://panic.test/"
        ));
        assert_eq!(fixture.sink.attempts(), 0);
        assert!(fixture.mailer.sent().is_empty());
    }
}
