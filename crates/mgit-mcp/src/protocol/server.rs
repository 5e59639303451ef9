//! MGit MCP Server Implementation
//!
//! This module implements the request dispatcher. Requests are handled
//! strictly one at a time: each line is parsed, routed through the method
//! table, answered, and recorded in the operation log before the next line is
//! read. The server context is owned outright, so the journals and the push
//! gate need no locking.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mgit_mcp_core::codes::{
    DEFAULT_PROTOCOL_VERSION, INTERNAL_ERROR, INVALID_REQUEST, METHOD_NOT_FOUND,
    PUSH_HISTORY_CHECK_REQUIRED,
};
use mgit_mcp_core::{Error, OperationLogEntry, ServerConfig};
use mgit_mcp_executor::PushExecutor;
use mgit_mcp_journal::{OperationLog, PushAttempt, PushLedger};
use rmcp::model::{CallToolResult, Content, ErrorCode};
use rmcp::ErrorData as McpError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, instrument, warn};

use crate::protocol::envelope::{parse_line, ErrorObject, Outcome, Request, Response};
use crate::protocol::method::Method;
use crate::session::Session;
use crate::tools::*;

/// Delay between answering `shutdown` and exiting.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// Capability categories mirrored back from the client's `initialize`.
const MIRRORED_CAPABILITIES: [&str; 4] = ["prompts", "resources", "logging", "roots"];

/// What the process should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep reading requests
    Continue,
    /// Exit after [`SHUTDOWN_GRACE`]
    Shutdown,
    /// Exit now
    Exit,
}

/// Outcome of handling one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Response to write, `None` for notifications
    pub response: Option<Response>,
    /// What to do next
    pub disposition: Disposition,
}

impl Reply {
    fn respond(response: Response) -> Self {
        Self {
            response: Some(response),
            disposition: Disposition::Continue,
        }
    }
}

/// Everything a handler can touch.
pub struct ServerContext {
    /// Immutable process configuration
    pub config: ServerConfig,
    /// Session state and push gate
    pub session: Session,
    /// Record of every handled request
    pub oplog: OperationLog,
    /// Persisted push attempts
    pub ledger: PushLedger,
    executor: Arc<dyn PushExecutor>,
}

impl ServerContext {
    /// Assemble a context from its parts.
    pub fn new(
        config: ServerConfig,
        oplog: OperationLog,
        ledger: PushLedger,
        executor: Arc<dyn PushExecutor>,
    ) -> Self {
        Self {
            config,
            session: Session::new(),
            oplog,
            ledger,
            executor,
        }
    }

    /// Context whose journals never touch the disk.
    pub fn in_memory(config: ServerConfig, executor: Arc<dyn PushExecutor>) -> Self {
        Self::new(
            config,
            OperationLog::in_memory(),
            PushLedger::in_memory(),
            executor,
        )
    }
}

/// MGit MCP Server
///
/// Dispatches line-delimited JSON-RPC requests against one [`ServerContext`].
pub struct MgitMcpServer {
    ctx: ServerContext,
}

impl MgitMcpServer {
    /// Create a server owning `ctx`.
    pub fn new(ctx: ServerContext) -> Self {
        Self { ctx }
    }

    /// Server state, for inspection.
    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Record a process lifecycle event in the operation log.
    pub fn record_event(&mut self, name: &str, params: Value, result: Value) {
        self.ctx.oplog.record(name, &params, Some(&result), None);
    }

    /// Serve requests from `input`, writing responses to `output`.
    ///
    /// Returns when a handler asks for shutdown or exit, or with
    /// [`Disposition::Exit`] when `input` reaches end of file.
    pub async fn serve<R, W>(&mut self, input: R, output: W) -> std::io::Result<Disposition>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.serve_until(input, output, std::future::pending()).await
    }

    /// Like [`serve`](Self::serve), but also stops once `shutdown` resolves.
    ///
    /// `shutdown` yields the name of the signal that stopped the server. It is
    /// only checked between requests, so a push in progress always completes
    /// and is recorded before the server returns [`Disposition::Exit`].
    pub async fn serve_until<R, W, F>(
        &mut self,
        mut input: R,
        mut output: W,
        shutdown: F,
    ) -> std::io::Result<Disposition>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        F: Future<Output = &'static str>,
    {
        tokio::pin!(shutdown);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                signal = &mut shutdown => {
                    self.record_signal(signal);
                    return Ok(Disposition::Exit);
                }
                read = input.read_until(b'\n', &mut buf) => read?,
            };
            if read == 0 {
                info!("Input closed");
                return Ok(Disposition::Exit);
            }

            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }

            let reply = self.handle_line(line.trim()).await;
            if let Some(response) = &reply.response {
                write_response(&mut output, response).await?;
            }
            if reply.disposition != Disposition::Continue {
                return Ok(reply.disposition);
            }
        }
    }

    /// Record a termination signal in the operation log.
    pub fn record_signal(&mut self, signal: &str) {
        info!("Received {} signal, shutting down server...", signal);
        self.record_event(
            signal,
            json!({ "signal": signal }),
            json!({ "status": "shutting_down" }),
        );
    }

    /// Handle one inbound line.
    pub async fn handle_line(&mut self, line: &str) -> Reply {
        match parse_line(line) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => {
                let response = err.to_response();
                if let Outcome::Error(e) = &response.outcome {
                    warn!("Rejected request line: {}", e.message);
                    self.ctx.oplog.record(
                        "error",
                        &json!({ "error": e.message }),
                        None,
                        Some(&e.message),
                    );
                }
                Reply::respond(response)
            }
        }
    }

    /// Handle one parsed request.
    #[instrument(skip_all, fields(method = %request.method))]
    pub async fn handle_request(&mut self, request: Request) -> Reply {
        if !request.has_supported_version() {
            let message = "Unsupported JSON-RPC version";
            warn!("{}: {}", message, request.jsonrpc);
            self.ctx.oplog.record(
                &request.method,
                &json!({ "jsonrpc": request.jsonrpc }),
                None,
                Some(message),
            );
            return Reply::respond(Response::error(
                request.id,
                ErrorObject::new(INVALID_REQUEST, message),
            ));
        }

        let params = request.params_or_empty();
        let method = Method::parse(&request.method);
        let outcome = match method {
            Some(method) => self.route(method, &params).await,
            None => Err(McpError::new(
                ErrorCode(METHOD_NOT_FOUND),
                format!("Unknown method: {}", request.method),
                None,
            )),
        };

        match &outcome {
            Ok(result) => {
                self.ctx
                    .oplog
                    .record(&request.method, &params, Some(result), None)
            }
            Err(e) => {
                debug!("Request failed: {}", e.message);
                self.ctx
                    .oplog
                    .record(&request.method, &params, None, Some(&e.message))
            }
        };

        let response = match outcome {
            Ok(result) => Response::result(request.id, result),
            Err(e) => Response::error(request.id, e.into()),
        };

        let disposition = match method {
            Some(Method::NotificationsExit) => Disposition::Exit,
            Some(Method::Shutdown) => Disposition::Shutdown,
            _ => Disposition::Continue,
        };
        let silent = method.map_or(false, |method| method.is_notification());
        Reply {
            response: (!silent).then_some(response),
            disposition,
        }
    }

    async fn route(&mut self, method: Method, params: &Value) -> Result<Value, McpError> {
        match method {
            Method::Initialize => Ok(self.initialize(params)),
            Method::ToolsList => Ok(self.list_tools()),
            Method::ToolsCall => self.call_tool(params).await,
            Method::Ping => {
                info!("ping");
                Ok(json!({ "pong": true }))
            }
            Method::Shutdown => {
                info!("Shutdown requested");
                Ok(Value::Null)
            }
            Method::NotificationsInitialized => {
                info!("Client finished initialization");
                Ok(Value::Null)
            }
            Method::NotificationsExit => {
                info!("Client requested exit");
                Ok(Value::Null)
            }
            Method::PromptsList => Ok(json!({ "prompts": [] })),
            Method::ResourcesList => Ok(json!({ "resources": [] })),
            Method::LoggingList => Ok(json!({ "logs": [] })),
            Method::RootsList => Ok(json!({ "roots": [] })),
            Method::PromptsCall => Ok(json!({
                "messages": [{
                    "role": "assistant",
                    "content": [{ "type": "text", "text": "Unsupported prompts call" }]
                }]
            })),
            Method::ResourcesRead => Ok(unsupported_read("resources")),
            Method::LoggingRead => Ok(unsupported_read("logging")),
            Method::RootsRead => Ok(unsupported_read("roots")),
        }
    }

    fn initialize(&mut self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION)
            .to_string();
        let client_capabilities = params
            .get("capabilities")
            .filter(|caps| caps.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));

        if self.ctx.session.initialize(&client_capabilities) {
            let client_info = params.get("clientInfo").cloned().unwrap_or_else(|| json!({}));
            info!(
                "Session initialized: protocol {}, client {}",
                protocol_version, client_info
            );
            self.ctx.oplog.record(
                "initialize",
                &json!({
                    "protocolVersion": protocol_version,
                    "capabilities": client_capabilities,
                    "clientInfo": client_info,
                }),
                None,
                None,
            );
        } else {
            debug!("initialize repeated; keeping negotiated capabilities");
        }

        let mut capabilities = Map::new();
        capabilities.insert("tools".to_string(), json!({ "listChanged": false }));
        for category in MIRRORED_CAPABILITIES {
            if advertised(&client_capabilities, category) {
                capabilities.insert(category.to_string(), json!({ "listChanged": false }));
            }
        }

        json!({
            "protocolVersion": protocol_version,
            "capabilities": capabilities,
            "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        })
    }

    fn list_tools(&self) -> Value {
        json!({
            "tools": describe_tools(&self.ctx.config),
            "environment": environment(&self.ctx.config),
        })
    }

    #[instrument(skip_all)]
    async fn call_tool(&mut self, params: &Value) -> Result<Value, McpError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| internal_error("Missing tool name"))?;

        let tool = ToolKind::resolve(&self.ctx.config, name)
            .ok_or_else(|| internal_error(format!("Unknown tool: {name}")))?;

        let args = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args.clone(),
        };

        debug!("Calling tool {:?}", tool);
        let result = match tool {
            ToolKind::MgitPush => self.mgit_push(&args).await?,
            ToolKind::GetPushHistory => self.get_push_history()?,
            ToolKind::GetOperationLogs => self.get_operation_logs(&args)?,
        };

        Ok(wrap_tool_result(result))
    }

    /// Push the commit message, if the gate admits it.
    #[instrument(skip_all)]
    async fn mgit_push(&mut self, args: &Value) -> Result<Value, McpError> {
        if !self.ctx.session.gate.admit_push() {
            warn!("Push rejected: push history has not been checked");
            return Ok(self.push_denied());
        }

        let params: MgitPushParams = serde_json::from_value::<MgitPushParams>(args.clone())
            .ok()
            .filter(|p| !p.message.is_empty())
            .ok_or_else(|| internal_error("Missing message parameter"))?;

        let repo_name = self.ctx.config.repo_name.clone();
        info!("Pushing to {}: {}", repo_name, params.message);

        match self.ctx.executor.push(&repo_name, &params.message).await {
            Ok(output) => {
                self.ctx.ledger.record(PushAttempt {
                    repo_name: repo_name.clone(),
                    message: params.message.clone(),
                    success: true,
                    error: None,
                    exit_code: Some(output.exit_code),
                });
                info!("Push succeeded");

                to_json(&MgitPushResponse {
                    success: true,
                    repo_name,
                    message: params.message,
                    output: output.stdout,
                    error_output: output.stderr,
                    exit_code: output.exit_code,
                })
            }
            Err(e) => {
                let exit_code = match &e {
                    Error::PushFailed { exit_code, .. } => *exit_code,
                    _ => None,
                };
                self.ctx.ledger.record(PushAttempt {
                    repo_name,
                    message: params.message,
                    success: false,
                    error: Some(e.to_string()),
                    exit_code,
                });
                error!("Push failed: {}", e);

                Err(internal_error(format!("MGit push failed: {e}")))
            }
        }
    }

    /// Read recent pushes and arm the gate.
    fn get_push_history(&mut self) -> Result<Value, McpError> {
        self.ctx.session.gate.mark_checked();

        let total = self.ctx.ledger.len();
        let records = self.ctx.ledger.recent(HISTORY_PREVIEW_LEN);
        let first_push = total == 0;
        let message = if first_push {
            format!(
                "No push history found for repository \"{}\". This will be the first push.",
                self.ctx.config.repo_name
            )
        } else {
            format!(
                "Found {} push record(s), showing the {} most recent. \
                 Make sure the next push does not repeat one of them.",
                total,
                records.len()
            )
        };
        debug!("Push history checked: {} record(s)", total);

        to_json(&PushHistoryResponse {
            total,
            records,
            message,
            first_push,
        })
    }

    fn get_operation_logs(&self, args: &Value) -> Result<Value, McpError> {
        let limit = integer_arg(args, "limit", DEFAULT_LOG_LIMIT)
            .filter(|limit| (1..=MAX_LOG_LIMIT).contains(limit))
            .ok_or_else(|| internal_error("limit parameter must be between 1-1000"))?;
        let offset = integer_arg(args, "offset", 0).ok_or_else(|| {
            internal_error("offset parameter must be greater than or equal to 0")
        })?;

        let total = self.ctx.oplog.len();
        let logs = self.ctx.oplog.page(offset as usize, limit as usize);

        to_json(&OperationLogsResponse {
            logs,
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total as u64,
        })
    }

    /// Denial payload returned while the gate is `Unchecked`.
    fn push_denied(&self) -> Value {
        let segments = denial_segments(&self.ctx.config)
            .into_iter()
            .map(Content::text)
            .collect();
        let mut payload = serde_json::to_value(CallToolResult::error(segments))
            .unwrap_or_else(|_| json!({ "content": [] }));
        if let Value::Object(obj) = &mut payload {
            obj.insert("isError".to_string(), Value::Bool(true));
            obj.insert(
                "errorCode".to_string(),
                Value::String(PUSH_HISTORY_CHECK_REQUIRED.to_string()),
            );
        }
        payload
    }
}

/// Append an `uncaughtException` entry for a worker crash to `log_file`.
pub fn record_uncaught(log_file: PathBuf, message: &str) -> OperationLogEntry {
    OperationLog::new(Some(log_file)).record(
        "uncaughtException",
        &json!({ "error": message }),
        None,
        Some(message),
    )
}

/// Wrap a plain tool result in one text block; pass `content`-bearing results through.
fn wrap_tool_result(result: Value) -> Value {
    if result.get("content").map_or(false, Value::is_array) {
        return result;
    }
    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
    serde_json::to_value(CallToolResult::success(vec![Content::text(text.clone())]))
        .unwrap_or_else(|_| json!({ "content": [{ "type": "text", "text": text }] }))
}

fn unsupported_read(category: &str) -> Value {
    json!({
        "contents": [{
            "uri": "error://unsupported",
            "text": format!("Unsupported {category} read"),
        }]
    })
}

/// Whether the client advertised `category` with a non-null, non-false value.
fn advertised(capabilities: &Value, category: &str) -> bool {
    !matches!(
        capabilities.get(category),
        None | Some(Value::Null) | Some(Value::Bool(false))
    )
}

/// Non-negative integral argument, `default` when absent, `None` when invalid.
///
/// Integral floats such as `10.0` are accepted.
fn integer_arg(args: &Value, key: &str, default: u64) -> Option<u64> {
    match args.get(key) {
        None | Some(Value::Null) => Some(default),
        Some(value) => value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64)
                .map(|n| n as u64)
        }),
    }
}

fn internal_error(message: impl Into<String>) -> McpError {
    McpError::new(ErrorCode(INTERNAL_ERROR), message.into(), None)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value)
        .map_err(|e| internal_error(format!("Failed to serialize response: {e}")))
}

async fn write_response<W>(output: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response).map_err(std::io::Error::other)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_plain_result() {
        let wrapped = wrap_tool_result(json!({ "total": 0 }));
        assert_eq!(wrapped["content"][0]["type"], "text");
        let text = wrapped["content"][0]["text"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({ "total": 0 }));
    }

    #[test]
    fn test_wrap_passes_content_through() {
        let result = json!({ "content": [{ "type": "text", "text": "hi" }], "isError": true });
        assert_eq!(wrap_tool_result(result.clone()), result);
    }

    #[test]
    fn test_advertised_capabilities() {
        let caps = json!({ "prompts": {}, "roots": { "listChanged": true }, "logging": null, "resources": false });
        assert!(advertised(&caps, "prompts"));
        assert!(advertised(&caps, "roots"));
        assert!(!advertised(&caps, "logging"));
        assert!(!advertised(&caps, "resources"));
        assert!(!advertised(&caps, "sampling"));
    }

    #[test]
    fn test_integer_arg() {
        let args = json!({ "limit": 10, "offset": -1, "bad": "5" });
        assert_eq!(integer_arg(&args, "limit", 50), Some(10));
        assert_eq!(integer_arg(&args, "missing", 50), Some(50));
        assert_eq!(integer_arg(&args, "offset", 0), None);
        assert_eq!(integer_arg(&args, "bad", 0), None);
    }

    #[test]
    fn test_integer_arg_accepts_integral_floats() {
        let args = json!({ "limit": 10.0, "offset": 2.5, "negative": -3.0 });
        assert_eq!(integer_arg(&args, "limit", 50), Some(10));
        assert_eq!(integer_arg(&args, "offset", 0), None);
        assert_eq!(integer_arg(&args, "negative", 0), None);
    }

    #[test]
    fn test_unsupported_read_payload() {
        let payload = unsupported_read("roots");
        assert_eq!(payload["contents"][0]["uri"], "error://unsupported");
        assert_eq!(payload["contents"][0]["text"], "Unsupported roots read");
    }
}
