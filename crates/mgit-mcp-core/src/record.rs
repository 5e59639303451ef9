//! Record types kept by the journals.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hands out creation-timestamp identifiers that never go backwards.
///
/// Two records created within the same millisecond get consecutive ids.
#[derive(Debug, Default, Clone)]
pub struct IdClock {
    last: i64,
}

impl IdClock {
    /// Create a clock starting at the epoch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that continues after `last`.
    pub fn resume_after(last: i64) -> Self {
        Self { last }
    }

    /// Next identifier: the current epoch milliseconds, bumped past the previous one.
    pub fn next_id(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// One entry of the in-memory operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    /// Creation timestamp in epoch milliseconds
    pub id: i64,
    /// RPC method (or lifecycle event) name
    pub method: String,
    /// Serialized parameters
    pub params: String,
    /// Serialized result, if any
    pub result: Option<String>,
    /// Error text, if any
    pub error: Option<String>,
    /// ISO-8601 creation time
    pub created_at: String,
}

impl OperationLogEntry {
    /// Render the line appended to the operation log file.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} | {} | {} | {} | RESPONSE: {}\n",
            self.created_at,
            self.method,
            self.params,
            self.error.as_deref().unwrap_or("SUCCESS"),
            self.result.as_deref().unwrap_or("null"),
        )
    }
}

/// One push attempt recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    /// Creation timestamp in epoch milliseconds
    pub id: i64,
    /// ISO-8601 time of the attempt
    pub timestamp: String,
    /// Repository the push targeted
    pub repo_name: String,
    /// Commit message as supplied by the caller
    pub message: String,
    /// Whether the external command exited with status 0
    pub success: bool,
    /// Failure description
    #[serde(default)]
    pub error: Option<String>,
    /// Exit code of the external command, if it ran to completion
    #[serde(default)]
    pub exit_code: Option<i32>,
}
