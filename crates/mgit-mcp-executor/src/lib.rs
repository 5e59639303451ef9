//! # mgit-mcp-executor
//!
//! The push executor: runs `<mgit> push <repo> <message>` as a direct
//! subprocess (no shell), relays its output to the diagnostic stream as it
//! arrives, and hands back everything it captured.
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends only on mgit-mcp-core.
//! The dispatcher talks to it through the [`PushExecutor`] trait so tests can
//! substitute a stub.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod executor;

// Re-export commonly used types
pub use executor::{sanitize_message, MgitExecutor, PushExecutor, PushOutput};
