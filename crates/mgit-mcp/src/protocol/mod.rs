//! MCP Protocol Layer
//!
//! This module implements the line-delimited JSON-RPC protocol: envelope
//! parsing, the method table, and the dispatcher that owns the server state.

pub mod envelope;
pub mod method;
pub mod server;

pub use envelope::{parse_line, EnvelopeError, ErrorObject, Outcome, Request, Response};
pub use method::Method;
pub use server::{
    record_uncaught, Disposition, MgitMcpServer, Reply, ServerContext, SHUTDOWN_GRACE,
};
