//! # mgit-mcp-journal
//!
//! Bounded journals kept by the MGit MCP server worker.
//!
//! This crate provides:
//! - The operation log: every RPC call and its outcome, held in memory and
//!   mirrored line-by-line to an append-only text file
//! - The push ledger: past push attempts, held in memory and rewritten in full
//!   to a JSON document on every change
//!
//! Neither journal ever fails the caller because of a disk problem; write
//! errors are reported through `tracing` and otherwise ignored.
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends only on mgit-mcp-core.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ledger;
pub mod oplog;

// Re-export commonly used types
pub use ledger::{PushAttempt, PushLedger, PUSH_HISTORY_CAPACITY};
pub use oplog::{OperationLog, OPERATION_LOG_CAPACITY};
