use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{Heartbeat, Job, Sleeper, TokioSleeper};
use crate::config::{Config, ConfigError};
use crate::database::{ResultSink, ResultStore};
use crate::monitoring::checker::{
    DnsResolver, HttpClient, LibsqlDriver, Pinger, QueryDriver, ReqwestHttpClient, Resolver,
    TcpPinger,
};
use crate::monitoring::validation::validate_timeout;
use crate::monitoring::{Probe, ProbeExecutor, ProbeKind};
use crate::notify::{Dispatcher, MailTransport, SmsTransport, Transports};

/// Assembles a [`Heartbeat`] from configuration.
///
/// Any collaborator left unset falls back to its production implementation.
/// Configuration is validated before the result store is opened, so a bad
/// file never touches the database.
pub struct HeartbeatBuilder {
    config: Config,
    http: Option<Arc<dyn HttpClient>>,
    resolver: Option<Arc<dyn Resolver>>,
    pinger: Option<Arc<dyn Pinger>>,
    driver: Option<Arc<dyn QueryDriver>>,
    sink: Option<Arc<dyn ResultSink>>,
    mail: Option<Arc<dyn MailTransport>>,
    sms: Option<Arc<dyn SmsTransport>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl HeartbeatBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            resolver: None,
            pinger: None,
            driver: None,
            sink: None,
            mail: None,
            sms: None,
            sleeper: None,
        }
    }

    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn pinger(mut self, pinger: Arc<dyn Pinger>) -> Self {
        self.pinger = Some(pinger);
        self
    }

    pub fn query_driver(mut self, driver: Arc<dyn QueryDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn mail_transport(mut self, mail: Arc<dyn MailTransport>) -> Self {
        self.mail = Some(mail);
        self
    }

    pub fn sms_transport(mut self, sms: Arc<dyn SmsTransport>) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Resolve `monitor` into probe groups, keeping declaration order
    fn probe_groups(&self) -> Result<Vec<(ProbeKind, Vec<Probe>)>, ConfigError> {
        let monitor = self.config.monitor.as_ref().ok_or(ConfigError::MissingSection("monitor"))?;

        monitor
            .iter()
            .map(|(name, instances)| {
                let kind: ProbeKind = name.parse()?;
                let instances = instances
                    .as_array()
                    .ok_or_else(|| ConfigError::invalid(kind, "expected an array of probe options"))?;
                let probes = instances
                    .iter()
                    .map(|options| Probe::resolve(kind, options.clone()))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((kind, probes))
            })
            .collect()
    }

    pub async fn build(self) -> Result<Heartbeat> {
        let groups = self.probe_groups()?;
        let notify = self.config.notify.as_ref().ok_or(ConfigError::MissingSection("notify"))?;
        validate_timeout(self.config.timeout_seconds)
            .map_err(|reason| ConfigError::invalid("timeout_seconds", reason))?;

        let transports = Transports {
            mail: self.mail.clone(),
            sms: self.sms.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(self.config.timeout_seconds))
                .build()
                .map_err(ConfigError::from)?,
        };
        let dispatcher = Arc::new(Dispatcher::from_config(notify, &transports)?);

        let timeout_seconds = self.config.timeout_seconds;
        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpClient::new(timeout_seconds).map_err(ConfigError::from)?),
        };
        let executor = Arc::new(ProbeExecutor::new(
            http,
            self.resolver.unwrap_or_else(|| Arc::new(DnsResolver)),
            self.pinger.unwrap_or_else(|| Arc::new(TcpPinger::new(timeout_seconds))),
            self.driver.unwrap_or_else(|| Arc::new(LibsqlDriver)),
        ));

        let sink: Arc<dyn ResultSink> = match self.sink {
            Some(sink) => sink,
            None => {
                info!("Opening result database {}", self.config.database);
                Arc::new(ResultStore::open(&self.config.database).await?)
            }
        };

        let jobs: Vec<Job> = groups
            .into_iter()
            .map(|(kind, probes)| {
                Job::new(kind, probes, executor.clone(), sink.clone(), dispatcher.clone())
            })
            .collect();

        let interval = Duration::from_millis(self.config.interval_ms());
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        info!(
            "Configured {} jobs and {} notification channels",
            jobs.len(),
            dispatcher.notifiers().len()
        );

        Ok(Heartbeat::new(jobs, interval, sleeper))
    }
}
