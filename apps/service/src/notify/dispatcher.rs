use futures::future::try_join_all;
use tracing::{debug, info};

use super::channel::{Notifier, Transports};
use crate::config::ConfigError;
use crate::error::NotifyError;
use crate::monitoring::CheckResult;

/// Fans failures out to every configured channel
#[derive(Debug)]
pub struct Dispatcher {
    notifiers: Vec<Notifier>,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Notifier>) -> Self {
        Self { notifiers }
    }

    /// Build one notifier per entry of the `notify` table
    pub fn from_config(notify: &toml::Table, transports: &Transports) -> Result<Self, ConfigError> {
        let notifiers = notify
            .iter()
            .map(|(name, options)| Notifier::from_config(name, options.clone(), transports))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(notifiers))
    }

    pub fn notifiers(&self) -> &[Notifier] {
        &self.notifiers
    }

    /// Send every failure through every channel concurrently.
    ///
    /// The first delivery error is returned; sends that already went out stay
    /// sent. Returns the number of notifier invocations.
    pub async fn dispatch(&self, failures: &[CheckResult]) -> Result<usize, NotifyError> {
        if failures.is_empty() {
            debug!("No failures to dispatch");
            return Ok(0);
        }

        let sends = self
            .notifiers
            .iter()
            .flat_map(|notifier| failures.iter().map(move |failure| notifier.notify(failure)));

        let sent = try_join_all(sends).await?.len();
        info!("Dispatched {} failures over {} channels", failures.len(), self.notifiers.len());
        Ok(sent)
    }
}
