//! Header-driven extraction of registrant emails and response records.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::parser::SheetRow;

/// Deduplicated addresses, iterated in first-seen order.
pub type EmailSet = IndexSet<String>;

/// Header name to trimmed cell value, keyed in header order.
pub type ResponseRecord = IndexMap<String, String>;

static EMAIL_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)e-mail|email|endereço de e-mail").expect("valid regex"));

static EMAIL_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Check an address against the `local@domain.tld` shape.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_ADDRESS.is_match(value)
}

/// Build the header list, naming blank columns `Column_<n>` (1-based).
pub fn derive_headers(raw: &[String]) -> Vec<String> {
    raw.iter()
        .enumerate()
        .map(|(i, h)| {
            let trimmed = h.trim();
            if trimmed.is_empty() {
                format!("Column_{}", i + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

/// Index of the first header that names an email column.
pub fn find_email_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| EMAIL_HEADER.is_match(&h.trim().to_lowercase()))
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

/// Extract the set of valid addresses from parsed rows.
///
/// Without a data row or an email column the set is empty. Invalid and blank
/// cells are skipped silently.
pub fn extract_emails(rows: &[SheetRow]) -> EmailSet {
    let mut emails = EmailSet::new();

    let Some((raw_headers, data_rows)) = rows.split_first() else {
        return emails;
    };
    if data_rows.is_empty() {
        return emails;
    }

    let headers = derive_headers(raw_headers);
    let Some(column) = find_email_column(&headers) else {
        info!(headers = ?headers, "email_column_not_found");
        return emails;
    };

    let mut skipped = 0usize;
    for row in data_rows {
        let value = cell(row, column);
        if !value.is_empty() && is_valid_email(value) {
            emails.insert(value.to_string());
        } else {
            skipped += 1;
        }
    }

    info!(
        email_column = %headers[column],
        data_rows = data_rows.len(),
        emails = emails.len(),
        skipped = skipped,
        "emails_extracted"
    );

    emails
}

/// Turn every non-blank data row into a record keyed by header.
///
/// Returns the derived headers alongside the records; both are empty when
/// there are no rows at all.
pub fn materialize_responses(rows: &[SheetRow]) -> (Vec<String>, Vec<ResponseRecord>) {
    let Some((raw_headers, data_rows)) = rows.split_first() else {
        return (Vec::new(), Vec::new());
    };

    let headers = derive_headers(raw_headers);
    let records: Vec<ResponseRecord> = data_rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), cell(row, i).to_string()))
                .collect()
        })
        .collect();

    debug!(
        headers = headers.len(),
        data_rows = data_rows.len(),
        records = records.len(),
        "responses_materialized"
    );

    (headers, records)
}
