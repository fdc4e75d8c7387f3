//! Meetup mailer - registrant broadcast and click tracking.
//!
//! This library provides shared modules for the two binaries:
//! - `meetup-mailer`: Tool server on stdio plus the click endpoints
//! - `meetup-tracker`: Click endpoints only
//!
//! ## Architecture
//!
//! ```text
//! Sheet export → SheetFetcher → parse_csv_rows → extract_emails → broadcast → MailTransport
//! Email link → web routes → ClickLedger ← get_clicks tool
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mcp;
pub mod sheet;
pub mod tools;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use broadcast::{broadcast, BroadcastOutcome, BroadcastResult, MailTransport, MailgunTransport};
pub use config::{Config, MailCredentials};
pub use error::{Error, Result};
pub use ledger::{ClickEvent, ClickLedger, FileLedger, MemoryLedger};
pub use mcp::McpServer;
pub use sheet::{EmailSet, ResponseRecord, SheetFetcher};
pub use tools::{ToolOutput, Toolbox};
pub use web::AppState;
