//! Outbound delivery capabilities for notifications.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Serialize;

pub const POSTMARK_ENDPOINT: &str = "https://api.postmarkapp.com/email";
pub const TWILIO_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Transactional email delivery
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// SMS delivery
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_message(&self, message: &SmsMessage) -> Result<()>;
}

/// Postmark email API
pub struct PostmarkMailer {
    client: reqwest::Client,
    server_token: String,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct PostmarkEmail<'a> {
    from: &'a str,
    to: String,
    subject: &'a str,
    text_body: &'a str,
}

impl PostmarkMailer {
    pub fn new(client: reqwest::Client, server_token: impl Into<String>) -> Self {
        Self { client, server_token: server_token.into(), endpoint: POSTMARK_ENDPOINT.into() }
    }

    /// Point the mailer at a different API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl MailTransport for PostmarkMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let payload = PostmarkEmail {
            from: &message.from,
            to: message.to.join(","),
            subject: &message.subject,
            text_body: &message.text_body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Postmark rejected message with status {}: {}", status, body);
        }

        Ok(())
    }
}

/// Twilio messaging API
pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
}

impl TwilioSms {
    pub fn new(
        client: reqwest::Client,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url: TWILIO_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/2010-04-01/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

#[async_trait]
impl SmsTransport for TwilioSms {
    async fn send_message(&self, message: &SmsMessage) -> Result<()> {
        let form = [
            ("From", message.from.as_str()),
            ("To", message.to.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Twilio rejected message with status {}: {}", status, body);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;

    fn email() -> EmailMessage {
        EmailMessage {
            from: "monitor@example.com".into(),
            to: vec!["ops@example.com".into(), "oncall@example.com".into()],
            subject: "[heartbeat] https://example.com is failing".into(),
            text_body: "{}".into(),
        }
    }

    #[tokio::test]
    async fn test_postmark_request() {
        let (url, request) = serve_once(200, r#"{"ErrorCode":0}"#).await;
        let mailer = PostmarkMailer::new(reqwest::Client::new(), "server-token").with_endpoint(url);

        mailer.send(&email()).await.unwrap();

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("post / http/1.1"));
        assert!(request.contains("x-postmark-server-token: server-token"));
        assert!(request.contains(r#""to":"ops@example.com,oncall@example.com""#));
        assert!(request.contains(r#""subject":"[heartbeat] https://example.com is failing""#));
    }

    #[tokio::test]
    async fn test_postmark_rejection_is_error() {
        let (url, _request) = serve_once(422, r#"{"ErrorCode":300}"#).await;
        let mailer = PostmarkMailer::new(reqwest::Client::new(), "server-token").with_endpoint(url);

        let error = mailer.send(&email()).await.unwrap_err();
        assert!(error.to_string().contains("422"));
    }

    #[tokio::test]
    async fn test_twilio_rejection_is_error() {
        let (url, _request) = serve_once(400, r#"{"code":21211}"#).await;
        let sms = TwilioSms::new(reqwest::Client::new(), "AC123", "secret")
            .with_base_url(url.trim_end_matches('/'));

        let error = sms
            .send_message(&SmsMessage {
                from: "+15550000000".into(),
                to: "+1555".into(),
                body: "down".into(),
            })
            .await
            .unwrap_err();

        assert!(error.to_string().contains("400"));
        assert!(error.to_string().contains("21211"));
    }

    #[tokio::test]
    async fn test_twilio_request() {
        let (url, request) = serve_once(201, "{}").await;
        let sms = TwilioSms::new(reqwest::Client::new(), "AC123", "secret")
            .with_base_url(url.trim_end_matches('/'));

        sms.send_message(&SmsMessage {
            from: "+15550000000".into(),
            to: "+15551111111".into(),
            body: "down".into(),
        })
        .await
        .unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json"));
        assert!(request.to_lowercase().contains("authorization: basic"));
        assert!(request.contains("To=%2B15551111111"));
        assert!(request.contains("Body=down"));
    }
}
