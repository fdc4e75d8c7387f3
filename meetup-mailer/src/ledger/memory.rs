//! In-memory click ledger.
//!
//! Single-process only and lost on exit. Used by tests and by callers that
//! embed the tools without a filesystem.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use super::{ClickEvent, ClickLedger};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    events: RwLock<Vec<ClickEvent>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger with existing events.
    pub fn with_events(events: Vec<ClickEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }
}

#[async_trait]
impl ClickLedger for MemoryLedger {
    async fn append(&self, event: ClickEvent) -> Result<()> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }

    async fn read_all(&self) -> Vec<ClickEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
