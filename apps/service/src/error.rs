use thiserror::Error;

/// A probe invocation that never produced results.
///
/// Unreachable or misbehaving targets are reported as failed
/// [`CheckResult`](crate::monitoring::CheckResult)s instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe task for {target} did not complete: {source}")]
    Task {
        target: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to render {channel} notification: {source}")]
    Render {
        channel: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{channel} delivery for {target} failed: {cause:#}")]
    Delivery {
        channel: &'static str,
        target: String,
        cause: anyhow::Error,
    },
}

/// Faults that abort a single job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to persist results: {0:#}")]
    Persist(anyhow::Error),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}
