//! File-backed click ledger.
//!
//! Each append rewrites the whole array to a sibling temporary file and
//! renames it over the ledger, so readers in other processes see either the
//! old or the new array, never a partial write. Appends inside one process
//! are serialized; appends from different processes are not coordinated and
//! may lose an update if they race.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::{ClickEvent, ClickLedger};
use crate::error::{Error, Result};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Click ledger stored as a pretty-printed JSON array.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted events, skipping elements that are not click events.
    async fn load(&self) -> Vec<ClickEvent> {
        let items = self.load_raw().await;
        let total = items.len();
        let events: Vec<ClickEvent> = items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        index = index,
                        error = %e,
                        "ledger_entry_skipped"
                    );
                    None
                }
            })
            .collect();

        if events.len() < total {
            warn!(
                path = %self.path.display(),
                kept = events.len(),
                skipped = total - events.len(),
                "ledger_read_partial"
            );
        }
        events
    }

    /// The persisted array as stored, degrading to empty when the file
    /// cannot be read or is not a JSON array.
    ///
    /// Elements are left undecoded so a rewrite carries malformed entries
    /// forward instead of dropping them.
    async fn load_raw(&self) -> Vec<Value> {
        match self.try_load_raw().await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "ledger_read_degraded");
                Vec::new()
            }
        }
    }

    async fn try_load_raw(&self) -> Result<Vec<Value>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "ledger_not_created_yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.degraded(e.to_string())),
        };

        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => {
                warn!(path = %self.path.display(), "ledger_not_an_array");
                Ok(Vec::new())
            }
            Err(e) => Err(self.degraded(format!("invalid JSON: {}", e))),
        }
    }

    async fn write_atomically(&self, items: &[Value]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)
            .map_err(|e| self.degraded(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.degraded(e.to_string()))?;
        }

        let temp = self.temp_path();
        if let Err(e) = fs::write(&temp, json).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.degraded(e.to_string()));
        }
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(self.degraded(e.to_string()));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clicks.json".to_string());
        let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{}.{}.{}.tmp", name, std::process::id(), unique))
    }

    fn degraded(&self, reason: String) -> Error {
        Error::PersistenceDegraded {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

#[async_trait]
impl ClickLedger for FileLedger {
    async fn append(&self, event: ClickEvent) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut items = self.load_raw().await;
        items.push(serde_json::to_value(&event).map_err(|e| self.degraded(e.to_string()))?);

        if let Err(e) = self.write_atomically(&items).await {
            error!(error = %e, "ledger_write_failed");
            return Err(e);
        }

        info!(
            path = %self.path.display(),
            total = items.len(),
            "ledger_appended"
        );
        Ok(())
    }

    async fn read_all(&self) -> Vec<ClickEvent> {
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ledger_in(dir: &TempDir) -> FileLedger {
        FileLedger::new(dir.path().join("clicks.json"))
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        assert!(ledger.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);

        let first = ClickEvent::new("u1", "2024-01-01T00:00:00.000Z");
        let second = ClickEvent::new("u2", "2024-01-01T00:00:01.000Z");
        ledger.append(first.clone()).await.unwrap();
        ledger.append(second.clone()).await.unwrap();

        assert_eq!(ledger.read_all().await, vec![first, second]);
    }

    #[tokio::test]
    async fn test_file_is_pretty_json_array() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        ledger
            .append(ClickEvent::new("ana", "2024-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.starts_with("[\n"));
        let parsed: Vec<ClickEvent> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn test_other_handle_sees_appends() {
        let dir = TempDir::new().unwrap();
        let writer = ledger_in(&dir);
        let reader = ledger_in(&dir);

        writer.append(ClickEvent::now("ana")).await.unwrap();
        let events = reader.read_all().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user, "ana");
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), "{not json").unwrap();

        assert!(ledger.read_all().await.is_empty());

        ledger.append(ClickEvent::new("ana", "t")).await.unwrap();
        assert_eq!(ledger.read_all().await, vec![ClickEvent::new("ana", "t")]);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_skipped_and_kept_on_append() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(
            ledger.path(),
            r#"[{"user":"ana","time":"t1"},{"user":"bob","time":"t2"},{"user":"cy"}]"#,
        )
        .unwrap();

        assert_eq!(
            ledger.read_all().await,
            vec![ClickEvent::new("ana", "t1"), ClickEvent::new("bob", "t2")]
        );

        ledger.append(ClickEvent::new("dan", "t3")).await.unwrap();

        assert_eq!(
            ledger.read_all().await,
            vec![
                ClickEvent::new("ana", "t1"),
                ClickEvent::new("bob", "t2"),
                ClickEvent::new("dan", "t3"),
            ]
        );
        let raw: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(ledger.path()).unwrap()).unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[2], serde_json::json!({ "user": "cy" }));
    }

    #[tokio::test]
    async fn test_non_array_json_reads_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        std::fs::write(ledger.path(), r#"{"user":"ana"}"#).unwrap();

        assert!(ledger.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_in_one_process() {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(ledger_in(&dir));

        let mut handles = Vec::new();
        for i in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.append(ClickEvent::now(format!("user{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledger.read_all().await.len(), 20);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger_in(&dir);
        ledger.append(ClickEvent::now("ana")).await.unwrap();
        ledger.append(ClickEvent::now("bob")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clicks.json"]);
    }

    #[tokio::test]
    async fn test_unwritable_location_reports_degraded() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let ledger = FileLedger::new(blocker.join("clicks.json"));

        let result = ledger.append(ClickEvent::now("ana")).await;
        assert!(matches!(result, Err(Error::PersistenceDegraded { .. })));
        assert!(ledger.read_all().await.is_empty());
    }
}
