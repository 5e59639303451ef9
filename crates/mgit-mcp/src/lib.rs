//! MGit MCP Server Library
//!
//! This library contains the protocol layer, session state, and tool
//! definitions of the MGit MCP server. The worker binary is in main.rs.
//!
//! ## Architecture
//!
//! This is Layer 2 - it ties together:
//! - mgit-mcp-core: configuration, records, error codes
//! - mgit-mcp-journal: operation log and push ledger
//! - mgit-mcp-executor: the external push command

pub mod protocol;
pub mod schema;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use protocol::{Disposition, MgitMcpServer, ServerContext};
pub use schema::SchemaTransformer;
pub use session::{PushGate, Session};
pub use tools::*;
