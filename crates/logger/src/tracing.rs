use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log layout (`json` or `compact`).
pub const LOG_FORMAT_VAR: &str = "RUST_LOG_FORMAT";

pub fn init() {
    init_tracing(LevelFilter::INFO);
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides `level`. Calling this twice keeps the first subscriber
/// and reports the second attempt as a warning instead of panicking.
pub fn init_tracing(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var(LOG_FORMAT_VAR).unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_filter(env_filter)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing subscriber already installed: {error}");
    }
}
