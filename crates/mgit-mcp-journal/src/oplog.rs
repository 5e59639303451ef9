//! In-memory operation log mirrored to an append-only file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use mgit_mcp_core::{now_iso8601, BoundedRing, IdClock, OperationLogEntry};
use serde_json::Value;
use tracing::warn;

/// Maximum number of entries held in memory.
pub const OPERATION_LOG_CAPACITY: usize = 1000;

/// Record of every RPC call handled by the worker.
#[derive(Debug)]
pub struct OperationLog {
    entries: BoundedRing<OperationLogEntry>,
    file: Option<PathBuf>,
    clock: IdClock,
}

impl OperationLog {
    /// Create a log mirrored to `file`, or memory-only when `None`.
    pub fn new(file: Option<PathBuf>) -> Self {
        Self::with_capacity(file, OPERATION_LOG_CAPACITY)
    }

    /// Create a log with a custom in-memory capacity.
    pub fn with_capacity(file: Option<PathBuf>, capacity: usize) -> Self {
        Self {
            entries: BoundedRing::new(capacity),
            file,
            clock: IdClock::new(),
        }
    }

    /// Create a memory-only log.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// File the log is mirrored to.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Append one entry and mirror it to disk.
    ///
    /// A `null` result is stored as no result.
    pub fn record(
        &mut self,
        method: &str,
        params: &Value,
        result: Option<&Value>,
        error: Option<&str>,
    ) -> OperationLogEntry {
        let entry = OperationLogEntry {
            id: self.clock.next_id(),
            method: method.to_string(),
            params: params.to_string(),
            result: result.filter(|v| !v.is_null()).map(Value::to_string),
            error: error.map(str::to_string),
            created_at: now_iso8601(),
        };

        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, &entry.to_log_line()) {
                warn!("Failed to write log file {}: {}", path.display(), e);
            }
        }

        self.entries.push(entry.clone());
        entry
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `limit` entries starting `offset` from the most recent.
    pub fn page(&self, offset: usize, limit: usize) -> Vec<OperationLogEntry> {
        self.entries.window(offset, limit).cloned().collect()
    }

    /// Iterate entries most-recent-first.
    pub fn iter(&self) -> impl Iterator<Item = &OperationLogEntry> {
        self.entries.iter()
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_inserts_at_head() {
        let mut log = OperationLog::in_memory();
        log.record("initialize", &json!({}), None, None);
        log.record("ping", &json!({}), Some(&json!({"pong": true})), None);

        let page = log.page(0, 10);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].method, "ping");
        assert_eq!(page[1].method, "initialize");
        assert!(page[0].id > page[1].id);
    }

    #[test]
    fn test_null_result_is_stored_as_none() {
        let mut log = OperationLog::in_memory();
        let entry = log.record("shutdown", &json!({}), Some(&Value::Null), None);
        assert!(entry.result.is_none());
    }

    #[test]
    fn test_serialized_fields() {
        let mut log = OperationLog::in_memory();
        let entry = log.record(
            "tools/call",
            &json!({"name": "demo_mgit_push"}),
            None,
            Some("MGit push failed: boom"),
        );
        assert_eq!(entry.params, r#"{"name":"demo_mgit_push"}"#);
        assert_eq!(entry.error.as_deref(), Some("MGit push failed: boom"));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut log = OperationLog::with_capacity(None, 3);
        for i in 0..5 {
            log.record(&format!("m{i}"), &json!({}), None, None);
        }
        assert_eq!(log.len(), 3);
        let methods: Vec<_> = log.iter().map(|e| e.method.clone()).collect();
        assert_eq!(methods, vec!["m4", "m3", "m2"]);
    }

    #[test]
    fn test_default_capacity_is_one_thousand() {
        let mut log = OperationLog::in_memory();
        for _ in 0..1001 {
            log.record("ping", &json!({}), None, None);
        }
        assert_eq!(log.len(), OPERATION_LOG_CAPACITY);
    }

    #[test]
    fn test_page_bounds() {
        let mut log = OperationLog::in_memory();
        for i in 0..5 {
            log.record(&format!("m{i}"), &json!({}), None, None);
        }
        assert_eq!(log.page(3, 10).len(), 2);
        assert!(log.page(5, 10).is_empty());
    }

    #[test]
    fn test_mirror_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mcp-mgit.log");
        let mut log = OperationLog::new(Some(path.clone()));

        log.record("ping", &json!({}), Some(&json!({"pong": true})), None);
        log.record("bogus", &json!({}), None, Some("Unknown method: bogus"));

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("| ping | {} | SUCCESS | RESPONSE: {\"pong\":true}"));
        assert!(lines[1].contains("| bogus | {} | Unknown method: bogus | RESPONSE: null"));
    }

    #[test]
    fn test_mirror_failure_does_not_fail_record() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every append fail
        let path = dir.path().join("blocked");
        fs::create_dir_all(&path).unwrap();

        let mut log = OperationLog::new(Some(path));
        log.record("ping", &json!({}), None, None);
        assert_eq!(log.len(), 1);
    }
}
