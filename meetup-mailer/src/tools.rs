//! The three tool operations exposed to the assistant host.
//!
//! Every call produces a [`ToolOutput`], failures included; errors never
//! escape past this boundary.

use std::sync::Arc;

use tracing::{error, info};

use crate::broadcast::{broadcast, BroadcastOutcome, MailTransport};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ledger::ClickLedger;
use crate::sheet::{extract_emails, materialize_responses, parse_csv_rows, EmailSet, SheetFetcher};

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// Handles shared by the tool operations.
#[derive(Clone)]
pub struct Toolbox {
    pub config: Arc<Config>,
    pub fetcher: SheetFetcher,
    pub ledger: Arc<dyn ClickLedger>,
    /// Absent when mail credentials are not configured
    pub mailer: Option<Arc<dyn MailTransport>>,
}

impl Toolbox {
    pub fn new(
        config: Arc<Config>,
        fetcher: SheetFetcher,
        ledger: Arc<dyn ClickLedger>,
        mailer: Option<Arc<dyn MailTransport>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            ledger,
            mailer,
        }
    }

    /// Fetch the form responses and render them as a summary plus JSON.
    pub async fn fetch_responses(
        &self,
        spreadsheet_id: Option<String>,
        gid: Option<u64>,
    ) -> ToolOutput {
        // Only an absent or empty id falls back; blank text is rejected by the fetcher
        let spreadsheet_id = spreadsheet_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.config.spreadsheet_id.clone());
        let gid = gid.unwrap_or(self.config.sheet_gid);

        match self.render_responses(&spreadsheet_id, gid).await {
            Ok(text) => ToolOutput::ok(text),
            Err(e) => {
                error!(
                    spreadsheet_id = %spreadsheet_id,
                    gid = gid,
                    error = %e,
                    "tool_fetch_responses_failed"
                );
                ToolOutput::error(format!("Error: {}", e))
            }
        }
    }

    async fn render_responses(&self, spreadsheet_id: &str, gid: u64) -> Result<String> {
        let csv_text = self.fetcher.fetch_csv(spreadsheet_id, gid).await?;
        let rows = parse_csv_rows(&csv_text);
        if rows.is_empty() {
            return Ok("Spreadsheet is empty or has no data.".to_string());
        }

        let (headers, records) = materialize_responses(&rows);
        let summary = format!(
            "Total responses: {}\nHeaders: {}",
            records.len(),
            headers.join(", ")
        );
        info!(
            records = records.len(),
            headers = headers.len(),
            "tool_fetch_responses_complete"
        );

        if records.is_empty() {
            return Ok(format!(
                "No responses found in the spreadsheet (only headers or blank rows).\n{}",
                summary
            ));
        }

        let body = serde_json::to_string_pretty(&records)
            .map_err(|e| Error::InvalidArgument(format!("could not encode responses: {}", e)))?;
        Ok(format!("{}\n\n--- Data (JSON) ---\n{}", summary, body))
    }

    /// Send `message` to every registrant found in the configured sheet.
    pub async fn broadcast_message(&self, message: &str) -> ToolOutput {
        if message.trim().is_empty() {
            return ToolOutput::error("The message field must not be empty.");
        }

        let Some(mailer) = self.mailer.as_ref() else {
            let missing = match self.config.mail_credentials() {
                Err(e) => e.to_string(),
                Ok(_) => "mail transport is not configured".to_string(),
            };
            return ToolOutput::error(format!(
                "Configure the mail transport in .env: {}.",
                missing
            ));
        };

        let emails = match self.registrant_emails().await {
            Ok(emails) => emails,
            Err(e) => {
                error!(error = %e, "tool_broadcast_fetch_failed");
                return ToolOutput::error(format!("Error sending emails: {}", e));
            }
        };

        match broadcast(mailer.as_ref(), message, &emails).await {
            Ok(BroadcastOutcome::NoRecipients) => ToolOutput::ok(
                "No email addresses found in the spreadsheet. Check that there is an email column (e.g. \"Email address\").",
            ),
            Ok(BroadcastOutcome::Delivered(result)) => ToolOutput::ok(result.summary()),
            Err(e) => ToolOutput::error(format!("Error sending emails: {}", e)),
        }
    }

    async fn registrant_emails(&self) -> Result<EmailSet> {
        let csv_text = self
            .fetcher
            .fetch_csv(&self.config.spreadsheet_id, self.config.sheet_gid)
            .await?;
        Ok(extract_emails(&parse_csv_rows(&csv_text)))
    }

    /// Report every recorded click.
    pub async fn read_clicks(&self) -> ToolOutput {
        let events = self.ledger.read_all().await;
        let mut text = format!("Total clicks: {}", events.len());
        if !events.is_empty() {
            let lines: Vec<String> = events
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {} - {}", i + 1, e.user, e.time))
                .collect();
            text.push_str("\n\n");
            text.push_str(&lines.join("\n"));
        }
        ToolOutput::ok(text)
    }
}
