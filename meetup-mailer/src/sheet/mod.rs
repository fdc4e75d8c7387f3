//! Spreadsheet ingestion: export fetch, CSV parsing and email extraction.
//!
//! ## Flow
//!
//! ```text
//! SheetFetcher::fetch_csv → parse_csv_rows → extract_emails / materialize_responses
//! ```

pub mod extract;
pub mod fetcher;
pub mod parser;

pub use parser::{parse_csv_rows, SheetRow};
pub use extract::{
    derive_headers, extract_emails, find_email_column, is_valid_email, materialize_responses,
    EmailSet, ResponseRecord,
};
pub use fetcher::{looks_like_html, SheetFetcher};
