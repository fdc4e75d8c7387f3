//! Outbound mail submission.
//!
//! The dispatcher only sees the [`MailTransport`] trait; production traffic
//! goes through the Mailgun messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::config::MailCredentials;
use crate::error::{Error, Result};

/// Submits a single message to a single recipient.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, message: &str) -> Result<()>;
}

/// Mailgun HTTP API transport.
///
/// Posts form-encoded messages to `{api_base}/v3/{domain}/messages` using
/// basic auth with the `api` user. No retries are attempted here.
#[derive(Clone)]
pub struct MailgunTransport {
    client: Client,
    credentials: MailCredentials,
    timeout: Duration,
}

impl MailgunTransport {
    pub fn new(client: Client, credentials: MailCredentials, timeout: Duration) -> Self {
        Self {
            client,
            credentials,
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v3/{}/messages",
            self.credentials.api_base.trim_end_matches('/'),
            self.credentials.domain
        )
    }
}

#[async_trait]
impl MailTransport for MailgunTransport {
    async fn send(&self, to: &str, message: &str) -> Result<()> {
        let form = [
            ("from", self.credentials.from.as_str()),
            ("to", to),
            ("subject", self.credentials.subject.as_str()),
            ("text", message),
        ];

        let response = self
            .client
            .post(self.endpoint())
            .basic_auth("api", Some(&self.credentials.api_key))
            .form(&form[..])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::DeliveryFailed {
                address: to.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(to = %to, status_code = status.as_u16(), "mailgun_send_rejected");
            return Err(Error::DeliveryFailed {
                address: to.to_string(),
                reason: format!("status={} body={}", status, truncate(&body)),
            });
        }

        info!(to = %to, status_code = status.as_u16(), "mailgun_send_accepted");
        Ok(())
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 512;
    match s.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
