//! Error taxonomy shared by the ingestion, broadcast and ledger modules.

use thiserror::Error;

/// Errors surfaced by the library.
///
/// `DeliveryFailed` is only ever captured into a broadcast result and
/// `PersistenceDegraded` is logged by callers that choose to degrade; both
/// exist here so every layer speaks the same vocabulary.
#[derive(Debug, Error)]
pub enum Error {
    /// A required input was blank or missing.
    #[error("{0}")]
    InvalidArgument(String),

    /// The spreadsheet export could not be retrieved.
    #[error("failed to fetch spreadsheet ({}): {reason}. Check that the sheet is shared as \"Anyone with the link can view\".", status_label(.status))]
    FetchFailed { status: Option<u16>, reason: String },

    /// The export host answered with an HTML page instead of CSV.
    #[error("the spreadsheet is not reachable as CSV (HTML response). Check that it is shared as \"Anyone with the link can view\".")]
    NotPublic,

    /// Mail transport credentials are absent.
    #[error("mail transport is not configured: set {}", .0.join(", "))]
    ConfigurationMissing(Vec<String>),

    /// A single recipient could not be reached.
    #[error("delivery to {address} failed: {reason}")]
    DeliveryFailed { address: String, reason: String },

    /// The click ledger could not be read or written.
    #[error("click ledger at {path} unavailable: {reason}")]
    PersistenceDegraded { path: String, reason: String },
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "network".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
