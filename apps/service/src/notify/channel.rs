use futures::future::try_join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::transport::{EmailMessage, MailTransport, PostmarkMailer, SmsMessage, SmsTransport, TwilioSms};
use crate::config::ConfigError;
use crate::error::NotifyError;
use crate::monitoring::CheckResult;

/// Supported notification channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Email,
    Sms,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::Sms => "sms",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "email" => Ok(ChannelKind::Email),
            "sms" => Ok(ChannelKind::Sms),
            other => Err(ConfigError::UnknownChannel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailOptions {
    pub from: String,
    pub to: Vec<String>,
    /// Postmark server token; required unless a mail transport is injected
    #[serde(default)]
    pub server_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmsOptions {
    pub from: String,
    pub to: Vec<String>,
    /// Twilio credentials; required unless an SMS transport is injected
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Transports handed to notifiers at construction.
///
/// A channel without an injected transport gets the default HTTP one,
/// built from the credentials in its options.
#[derive(Clone, Default)]
pub struct Transports {
    pub mail: Option<Arc<dyn MailTransport>>,
    pub sms: Option<Arc<dyn SmsTransport>>,
    pub client: reqwest::Client,
}

/// A configured notification channel
pub enum Notifier {
    Email { options: EmailOptions, transport: Arc<dyn MailTransport> },
    Sms { options: SmsOptions, transport: Arc<dyn SmsTransport> },
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("channel", &self.channel()).finish()
    }
}

fn parse_options<T: DeserializeOwned>(kind: ChannelKind, options: toml::Value) -> Result<T, ConfigError> {
    options.try_into::<T>().map_err(|e| ConfigError::invalid(kind, e))
}

impl Notifier {
    /// Resolve a channel name and its options
    pub fn from_config(
        name: &str,
        options: toml::Value,
        transports: &Transports,
    ) -> Result<Self, ConfigError> {
        let kind: ChannelKind = name.parse()?;

        match kind {
            ChannelKind::Email => {
                let options: EmailOptions = parse_options(kind, options)?;
                if options.to.is_empty() {
                    return Err(ConfigError::invalid(kind, "no recipients"));
                }

                let transport: Arc<dyn MailTransport> = match (&transports.mail, &options.server_token) {
                    (Some(transport), _) => transport.clone(),
                    (None, Some(token)) => {
                        Arc::new(PostmarkMailer::new(transports.client.clone(), token.clone()))
                    }
                    (None, None) => return Err(ConfigError::invalid(kind, "missing server_token")),
                };

                Ok(Notifier::Email { options, transport })
            }
            ChannelKind::Sms => {
                let options: SmsOptions = parse_options(kind, options)?;
                if options.to.is_empty() {
                    return Err(ConfigError::invalid(kind, "no recipients"));
                }

                let transport: Arc<dyn SmsTransport> = match (&transports.sms, &options.account_sid, &options.auth_token) {
                    (Some(transport), _, _) => transport.clone(),
                    (None, Some(sid), Some(token)) => Arc::new(TwilioSms::new(
                        transports.client.clone(),
                        sid.clone(),
                        token.clone(),
                    )),
                    _ => return Err(ConfigError::invalid(kind, "missing account_sid or auth_token")),
                };

                Ok(Notifier::Sms { options, transport })
            }
        }
    }

    pub fn channel(&self) -> ChannelKind {
        match self {
            Notifier::Email { .. } => ChannelKind::Email,
            Notifier::Sms { .. } => ChannelKind::Sms,
        }
    }

    /// Render `failure` for this channel and deliver it
    pub async fn notify(&self, failure: &CheckResult) -> Result<(), NotifyError> {
        let delivery_error = |cause: anyhow::Error| NotifyError::Delivery {
            channel: self.channel().as_str(),
            target: failure.target.clone(),
            cause,
        };

        match self {
            Notifier::Email { options, transport } => {
                let message = render_email(options, failure)?;
                transport.send(&message).await.map_err(delivery_error)
            }
            Notifier::Sms { options, transport } => {
                let messages = render_sms(options, failure)?;
                try_join_all(messages.iter().map(|message| transport.send_message(message)))
                    .await
                    .map(|_| ())
                    .map_err(delivery_error)
            }
        }
    }
}

/// One email to every recipient; the subject names the failed target
pub fn render_email(options: &EmailOptions, failure: &CheckResult) -> Result<EmailMessage, NotifyError> {
    let text_body = serde_json::to_string_pretty(failure)
        .map_err(|source| NotifyError::Render { channel: "email", source })?;

    Ok(EmailMessage {
        from: options.from.clone(),
        to: options.to.clone(),
        subject: format!("[heartbeat] {} is failing", failure.target),
        text_body,
    })
}

/// One message per recipient
pub fn render_sms(options: &SmsOptions, failure: &CheckResult) -> Result<Vec<SmsMessage>, NotifyError> {
    let body = serde_json::to_string(failure)
        .map_err(|source| NotifyError::Render { channel: "sms", source })?;

    Ok(options
        .to
        .iter()
        .map(|to| SmsMessage { from: options.from.clone(), to: to.clone(), body: body.clone() })
        .collect())
}
