//! # mgit-mcp-core
//!
//! Core types for the MGit MCP server.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other mgit-mcp crates. It provides:
//!
//! - Process-wide configuration (`ServerConfig`, `SupervisorSettings`)
//! - The bounded most-recent-first ring used by both journals
//! - Record types for push history and operation logging
//! - JSON-RPC error codes shared by the dispatcher
//! - Error types
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other mgit-mcp crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codes;
pub mod config;
pub mod error;
pub mod record;
pub mod ring;

// Re-export commonly used types
pub use config::{
    LogPaths, ServerConfig, SupervisorMode, SupervisorSettings, REPO_NAME_HELP,
};
pub use error::{Error, Result};
pub use record::{now_iso8601, IdClock, OperationLogEntry, PushRecord};
pub use ring::BoundedRing;
