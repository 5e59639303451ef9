//! # mgit-mcp-supervisor
//!
//! Lifecycle management for the MGit MCP server worker process.
//!
//! This crate provides:
//! - Launching the worker with the supervisor's standard streams
//! - Restart decisions for managed and CLI modes
//! - Signal forwarding with a bounded graceful shutdown
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends only on mgit-mcp-core.
//! The supervisor never looks at RPC traffic; its only contact with the
//! worker is signal delivery and exit-status observation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod policy;
pub mod signal;
pub mod supervisor;

// Re-export commonly used types
pub use policy::{ExitDecision, RestartPolicy};
pub use signal::{ForwardSignal, SupervisorSignal};
pub use supervisor::{Supervisor, SupervisorExit, WorkerSpec};
