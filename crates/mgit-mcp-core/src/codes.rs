//! JSON-RPC error codes and protocol constants.

/// The only accepted `jsonrpc` envelope tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version reported when `initialize` does not name one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Envelope rejected before dispatch (bad `jsonrpc` tag, unusable shape).
pub const INVALID_REQUEST: i32 = -32600;

/// Method name not in the dispatch table.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Generic failure. Unknown tools and failed pushes are reported with this code too.
pub const INTERNAL_ERROR: i32 = -32603;

/// Reserved for requests arriving before `initialize`. No handler enforces it.
pub const SERVER_NOT_INITIALIZED: i32 = -32002;

/// Marker carried by the push denial payload.
pub const PUSH_HISTORY_CHECK_REQUIRED: &str = "PUSH_HISTORY_CHECK_REQUIRED";
