pub mod checker;
/// Monitoring engine module - turns probe definitions into results
///
/// This module is responsible for:
/// - Resolving probe type names and options into [`Probe`]s
/// - Executing HTTP/JSON/query/resolve/ping probes
/// - Validating probe options at construction time
pub mod executor;
pub mod probe;
pub mod types;
pub mod validation;

pub use checker::{HttpClient, Pinger, QueryConnection, QueryDriver, Resolver};
pub use executor::ProbeExecutor;
pub use probe::{Probe, ProbeKind};
pub use types::{CheckResult, MonitorStatus, Outcome};
