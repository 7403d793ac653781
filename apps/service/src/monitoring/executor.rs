use futures::future::join_all;
use serde_json::Value;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use super::checker::{HttpClient, HttpResponse, Pinger, QueryDriver, Resolver};
use super::probe::{DEFAULT_PING_PORT, JsonOptions, Probe, QueryOptions, ResolveOptions};
use super::types::CheckResult;

/// Probe executor - runs a single probe through the injected capabilities
pub struct ProbeExecutor {
    http: Arc<dyn HttpClient>,
    resolver: Arc<dyn Resolver>,
    pinger: Arc<dyn Pinger>,
    driver: Arc<dyn QueryDriver>,
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl ProbeExecutor {
    /// Create a new probe executor
    pub fn new(
        http: Arc<dyn HttpClient>,
        resolver: Arc<dyn Resolver>,
        pinger: Arc<dyn Pinger>,
        driver: Arc<dyn QueryDriver>,
    ) -> Self {
        Self { http, resolver, pinger, driver }
    }

    /// Execute a probe.
    ///
    /// Returns one result per probed target: a `resolve` probe fans out to one
    /// result per resolved address, every other kind yields exactly one.
    pub async fn execute(&self, probe: &Probe) -> Vec<CheckResult> {
        debug!("Executing {} probe against {}", probe.kind(), probe.target());

        match probe {
            Probe::Http(options) => vec![self.check_http(&options.url).await],
            Probe::Json(options) => vec![self.check_json(options).await],
            Probe::Query(options) => vec![self.check_query(options).await],
            Probe::Resolve(options) => self.check_resolve(options).await,
            Probe::Ping(options) => vec![self.check_ping(options.ip, options.port).await],
        }
    }

    /// GET `url`; a failed check is returned as `Err`
    async fn fetch(&self, url: &str) -> Result<(HttpResponse, u64), CheckResult> {
        let start = Instant::now();
        let response = self.http.get(url).await;
        let latency = elapsed_ms(start);

        match response {
            Ok(response) if response.status == 200 => Ok((response, latency)),
            Ok(response) => Err(CheckResult::down(url, "unexpected status code")
                .with_response_time(latency)
                .with_status_code(response.status)
                .with_cause(format!("HTTP status {}", response.status))),
            Err(e) => Err(CheckResult::down(url, "request failed")
                .with_response_time(latency)
                .with_cause(format!("{e:#}"))),
        }
    }

    async fn check_http(&self, url: &str) -> CheckResult {
        match self.fetch(url).await {
            Ok((response, latency)) => CheckResult::up(url, latency, Some(response.status)),
            Err(failed) => failed,
        }
    }

    async fn check_json(&self, options: &JsonOptions) -> CheckResult {
        let (response, latency) = match self.fetch(&options.url).await {
            Ok(fetched) => fetched,
            Err(failed) => return failed,
        };

        let actual: Value = match serde_json::from_slice(&response.body) {
            Ok(actual) => actual,
            Err(e) => {
                return CheckResult::down(&options.url, "invalid json body")
                    .with_response_time(latency)
                    .with_status_code(response.status)
                    .with_cause(e);
            }
        };

        // Value equality ignores object key order but not array order
        if actual == options.expected {
            CheckResult::up(&options.url, latency, Some(response.status))
        } else {
            CheckResult::mismatch(&options.url, options.expected.clone(), actual)
        }
    }

    async fn check_query(&self, options: &QueryOptions) -> CheckResult {
        let conn = match self.driver.connect(&options.connection, options.auth_token.as_deref()).await {
            Ok(conn) => conn,
            Err(e) => {
                return CheckResult::down(&options.connection, "failed to connect database")
                    .with_cause(format!("{e:#}"));
            }
        };

        let start = Instant::now();
        let outcome = conn.execute(&options.query).await;
        let latency = elapsed_ms(start);
        drop(conn);

        match outcome {
            Ok(()) => CheckResult::up(&options.connection, latency, None),
            Err(e) => CheckResult::down(&options.connection, "query failed")
                .with_response_time(latency)
                .with_cause(format!("{e:#}")),
        }
    }

    async fn check_resolve(&self, options: &ResolveOptions) -> Vec<CheckResult> {
        let addresses = match self.resolver.resolve_ipv4(&options.name).await {
            Ok(addresses) if !addresses.is_empty() => addresses,
            Ok(_) => {
                return vec![
                    CheckResult::down(&options.name, "failed resolved ip by name")
                        .with_cause("no IPv4 addresses"),
                ];
            }
            Err(e) => {
                return vec![
                    CheckResult::down(&options.name, "failed resolved ip by name")
                        .with_cause(format!("{e:#}")),
                ];
            }
        };

        debug!("{} resolved to {} addresses", options.name, addresses.len());

        join_all(addresses.into_iter().map(|ip| self.check_ping(IpAddr::V4(ip), DEFAULT_PING_PORT)))
            .await
    }

    async fn check_ping(&self, ip: IpAddr, port: u16) -> CheckResult {
        let start = Instant::now();
        let reached = self.pinger.ping(ip, port).await;
        let latency = elapsed_ms(start);

        match reached {
            Ok(()) => CheckResult::up(ip.to_string(), latency, None),
            Err(e) => CheckResult::down(ip.to_string(), "host unreachable")
                .with_response_time(latency)
                .with_cause(format!("{e:#}")),
        }
    }
}
