//! Disk-backed ledger of push attempts.
//!
//! The ledger is loaded once at startup, replacing the in-memory ring
//! wholesale, and the full ring is rewritten to a JSON array after every
//! mutation. Entries are ordered most-recent-first in memory and on disk.

use std::fs;
use std::path::{Path, PathBuf};

use mgit_mcp_core::{now_iso8601, BoundedRing, IdClock, PushRecord, Result};
use tracing::{debug, info, warn};

/// Maximum number of push attempts retained.
pub const PUSH_HISTORY_CAPACITY: usize = 100;

/// Outcome of one push attempt, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushAttempt {
    /// Repository the push targeted
    pub repo_name: String,
    /// Commit message as supplied by the caller
    pub message: String,
    /// Whether the external command succeeded
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
    /// Exit code of the external command
    pub exit_code: Option<i32>,
}

/// Bounded, persisted record of past push attempts.
#[derive(Debug)]
pub struct PushLedger {
    records: BoundedRing<PushRecord>,
    path: Option<PathBuf>,
    clock: IdClock,
}

impl PushLedger {
    /// Create an empty ledger that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            records: BoundedRing::new(PUSH_HISTORY_CAPACITY),
            path: None,
            clock: IdClock::new(),
        }
    }

    /// Open the ledger stored at `path`.
    ///
    /// A missing file yields an empty ledger. An unreadable or corrupt file is
    /// reported and also yields an empty ledger; it is overwritten on the next
    /// push.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut ledger = Self {
            records: BoundedRing::new(PUSH_HISTORY_CAPACITY),
            path: Some(path.into()),
            clock: IdClock::new(),
        };
        match ledger.load() {
            Ok(count) => info!("Loaded {} push history record(s)", count),
            Err(e) => warn!("Failed to load push history: {}", e),
        }
        ledger
    }

    /// File the ledger is persisted to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the in-memory ring with the persisted one.
    ///
    /// Returns the number of records loaded.
    pub fn load(&mut self) -> Result<usize> {
        let Some(path) = &self.path else {
            return Ok(0);
        };
        if !path.exists() {
            debug!("No push history file at {}", path.display());
            return Ok(0);
        }

        let content = fs::read_to_string(path)?;
        let records: Vec<PushRecord> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content)?
        };

        let newest = records.iter().map(|r| r.id).max().unwrap_or(0);
        self.clock = IdClock::resume_after(newest);
        self.records.replace_all(records);
        Ok(self.records.len())
    }

    /// Stamp and store one push attempt, then persist the ledger.
    ///
    /// Persistence failures are logged, never returned.
    pub fn record(&mut self, attempt: PushAttempt) -> PushRecord {
        let record = PushRecord {
            id: self.clock.next_id(),
            timestamp: now_iso8601(),
            repo_name: attempt.repo_name,
            message: attempt.message,
            success: attempt.success,
            error: attempt.error,
            exit_code: attempt.exit_code,
        };
        self.records.push(record.clone());

        if let Err(e) = self.persist() {
            warn!("Failed to save push history: {}", e);
        }
        record
    }

    /// Write the full ring to disk.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.records.to_vec())?;
        fs::write(path, json)?;
        debug!(
            "Saved {} push history record(s) to {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }

    /// Up to `count` most recent records.
    pub fn recent(&self, count: usize) -> Vec<PushRecord> {
        self.records.window(0, count).cloned().collect()
    }

    /// All records, most-recent-first.
    pub fn records(&self) -> Vec<PushRecord> {
        self.records.to_vec()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no push has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(message: &str, success: bool) -> PushAttempt {
        PushAttempt {
            repo_name: "demo".to_string(),
            message: message.to_string(),
            success,
            error: (!success).then(|| "Command exited with code 1".to_string()),
            exit_code: Some(if success { 0 } else { 1 }),
        }
    }

    #[test]
    fn test_in_memory_ledger_starts_empty() {
        let ledger = PushLedger::in_memory();
        assert!(ledger.is_empty());
        assert!(ledger.recent(5).is_empty());
    }

    #[test]
    fn test_record_is_most_recent_first() {
        let mut ledger = PushLedger::in_memory();
        ledger.record(attempt("first", true));
        ledger.record(attempt("second", false));

        let recent = ledger.recent(5);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert!(!recent[0].success);
        assert_eq!(recent[1].message, "first");
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut ledger = PushLedger::in_memory();
        for i in 0..(PUSH_HISTORY_CAPACITY + 5) {
            ledger.record(attempt(&format!("push {i}"), true));
        }
        assert_eq!(ledger.len(), PUSH_HISTORY_CAPACITY);
        assert_eq!(ledger.recent(1)[0].message, "push 104");
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PushLedger::open(dir.path().join("push-history.json"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push-history.json");
        fs::write(&path, "{ not json").unwrap();

        let mut ledger = PushLedger::open(&path);
        assert!(ledger.is_empty());

        ledger.record(attempt("recovered", true));
        let reopened = PushLedger::open(&path);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_file_is_rewritten_not_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push-history.json");
        let mut ledger = PushLedger::open(&path);
        ledger.record(attempt("one", true));
        ledger.record(attempt("two", true));

        let on_disk: Vec<PushRecord> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk[0].message, "two");
    }

    #[test]
    fn test_ids_continue_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("push-history.json");
        let mut ledger = PushLedger::open(&path);
        let first = ledger.record(attempt("one", true));

        let mut reopened = PushLedger::open(&path);
        let second = reopened.record(attempt("two", true));
        assert!(second.id > first.id);
    }
}
