//! Mail Transport — single delivery attempt, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail API rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_body: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MailApiReply {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    message: String,
}

/// Sends through a Postmark-compatible HTTP API (`POST /email`).
#[derive(Clone)]
pub struct HttpMailTransport {
    client: Client,
    api_url: String,
    api_token: String,
    from: String,
}

impl HttpMailTransport {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = OutboundEmail {
            from: &self.from,
            to: recipient,
            subject,
            text_body: body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.api_token)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let reply = serde_json::from_str::<MailApiReply>(&text).ok();

        if !status.is_success() {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: reply.map(|r| r.message).unwrap_or(text),
            });
        }
        if let Some(reply) = reply.filter(|r| r.error_code != 0) {
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: reply.message,
            });
        }

        debug!(%recipient, "mail accepted by API");
        Ok(())
    }
}
