//! Append-only click ledger.
//!
//! The ledger is the only state shared between processes. [`FileLedger`]
//! persists it as a pretty-printed JSON array; [`MemoryLedger`] keeps it in
//! process for tests.
//!
//! ## Storage Layout
//!
//! ```text
//! [
//!   { "user": "ana", "time": "2024-05-01T18:30:00.000Z" },
//!   ...
//! ]
//! ```

pub mod file;
pub mod memory;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use file::FileLedger;
pub use memory::MemoryLedger;

/// User recorded for clicks on the bare root link.
pub const ANONYMOUS_USER: &str = "visitor";

/// A single recorded click. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub user: String,
    /// ISO-8601 UTC timestamp
    pub time: String,
}

impl ClickEvent {
    pub fn new(user: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            time: time.into(),
        }
    }

    /// Stamp a click with the current UTC time at millisecond precision.
    pub fn now(user: impl Into<String>) -> Self {
        Self::new(
            user,
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

/// Durable, ordered log of click events.
///
/// `read_all` never fails the caller: read problems are logged and reported
/// as an empty ledger.
#[async_trait]
pub trait ClickLedger: Send + Sync {
    /// Append one event after every event already persisted.
    async fn append(&self, event: ClickEvent) -> Result<()>;

    /// Every persisted event, oldest first.
    async fn read_all(&self) -> Vec<ClickEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_click_event_now_is_iso8601() {
        let event = ClickEvent::now("ana");
        assert_eq!(event.user, "ana");
        assert!(event.time.ends_with('Z'));
        assert_eq!(event.time.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(DateTime::parse_from_rfc3339(&event.time).is_ok());
    }

    #[test]
    fn test_click_event_json_shape() {
        let event = ClickEvent::new("ana", "2024-01-01T00:00:00.000Z");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"user":"ana","time":"2024-01-01T00:00:00.000Z"}"#);
    }
}
