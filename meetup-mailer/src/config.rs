//! Configuration module for environment variable parsing.
//!
//! All settings come from environment variables. An optional `.env` file in
//! the working directory is loaded first by the binaries.

use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{Error, Result};

/// Spreadsheet linked to the meetup registration form.
pub const DEFAULT_SPREADSHEET_ID: &str = "1P3LoDlfpV4G4SCzNAaTjMMn82pXwFz9zY7dQCgi6-eo";

/// Tab holding the form responses.
pub const DEFAULT_SHEET_GID: u64 = 1051106952;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Spreadsheet used when a tool call does not name one
    pub spreadsheet_id: String,

    /// Tab identifier (gid) used when a tool call does not name one
    pub sheet_gid: u64,

    /// Scheme and host serving the CSV export
    pub sheets_base_url: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    // =========================================================================
    // Click Tracking
    // =========================================================================

    /// Port for the click-receiving web server
    pub track_port: u16,

    /// Ledger location, resolved against the working directory
    pub clicks_file: PathBuf,

    // =========================================================================
    // Mail Transport
    // =========================================================================

    /// Sender address for broadcast messages
    pub mail_from: Option<String>,

    /// Mailgun API key
    pub mailgun_api_key: Option<String>,

    /// Mailgun sending domain
    pub mailgun_domain: Option<String>,

    /// Mailgun API host
    pub mailgun_api_base: String,

    /// Subject line of broadcast messages
    pub mail_subject: String,
}

/// Complete set of mail transport credentials.
#[derive(Debug, Clone)]
pub struct MailCredentials {
    pub from: String,
    pub api_key: String,
    pub domain: String,
    pub api_base: String,
    pub subject: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            spreadsheet_id: env::var("SPREADSHEET_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SPREADSHEET_ID.to_string()),

            sheet_gid: parse_number("SHEET_GID", DEFAULT_SHEET_GID),

            sheets_base_url: env::var("SHEETS_BASE_URL")
                .unwrap_or_else(|_| "https://docs.google.com".to_string()),

            request_timeout_ms: parse_number("REQUEST_TIMEOUT_MS", 15000),

            track_port: parse_number("TRACK_PORT", 3000),

            clicks_file: resolve_clicks_file(
                &env::var("CLICKS_FILE").unwrap_or_else(|_| "clicks.json".to_string()),
            ),

            mail_from: non_blank("MAIL_FROM"),

            mailgun_api_key: non_blank("MAILGUN_API_KEY"),

            mailgun_domain: non_blank("MAILGUN_DOMAIN"),

            mailgun_api_base: env::var("MAILGUN_API_BASE")
                .unwrap_or_else(|_| "https://api.mailgun.net".to_string()),

            mail_subject: env::var("MAIL_SUBJECT").unwrap_or_else(|_| "Meetup".to_string()),
        }
    }

    /// Collect the mail credentials, naming every missing variable on failure.
    pub fn mail_credentials(&self) -> Result<MailCredentials> {
        let mut missing = Vec::new();
        if self.mail_from.is_none() {
            missing.push("MAIL_FROM".to_string());
        }
        if self.mailgun_api_key.is_none() {
            missing.push("MAILGUN_API_KEY".to_string());
        }
        if self.mailgun_domain.is_none() {
            missing.push("MAILGUN_DOMAIN".to_string());
        }

        match (&self.mail_from, &self.mailgun_api_key, &self.mailgun_domain) {
            (Some(from), Some(api_key), Some(domain)) => Ok(MailCredentials {
                from: from.clone(),
                api_key: api_key.clone(),
                domain: domain.clone(),
                api_base: self.mailgun_api_base.clone(),
                subject: self.mail_subject.clone(),
            }),
            _ => Err(Error::ConfigurationMissing(missing)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.to_string(),
            sheet_gid: DEFAULT_SHEET_GID,
            sheets_base_url: "https://docs.google.com".to_string(),
            request_timeout_ms: 15000,
            track_port: 3000,
            clicks_file: PathBuf::from("clicks.json"),
            mail_from: None,
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_api_base: "https://api.mailgun.net".to_string(),
            mail_subject: "Meetup".to_string(),
        }
    }
}

/// Parse a numeric variable, falling back to the default on absence or garbage.
fn parse_number<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Relative ledger paths are anchored at the current working directory.
fn resolve_clicks_file(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return path;
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            warn!(error = %e, "Working directory unavailable, using relative ledger path");
            path
        }
    }
}
