//! Failure notifications.
//!
//! `channel` resolves the `notify` table into [`Notifier`]s, `dispatcher`
//! fans a failure batch out to them and `transport` holds the email and SMS
//! delivery capabilities.

pub mod channel;
pub mod dispatcher;
pub mod transport;

pub use channel::{ChannelKind, Notifier, Transports};
pub use dispatcher::Dispatcher;
pub use transport::{EmailMessage, MailTransport, SmsMessage, SmsTransport};
