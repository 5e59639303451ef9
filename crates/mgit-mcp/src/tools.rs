//! MCP Tool Types and Descriptors
//!
//! This module defines the parameter and response types of the three tools,
//! the closed table of tool names, and the descriptors returned by
//! `tools/list`.

use mgit_mcp_core::{OperationLogEntry, PushRecord, ServerConfig};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::input_schema;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "mgit-mcp-server";

/// Version reported in `serverInfo`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Records returned by a history read.
pub const HISTORY_PREVIEW_LEN: usize = 5;

/// Default page size for operation logs.
pub const DEFAULT_LOG_LIMIT: u64 = 50;

/// Largest accepted page size for operation logs.
pub const MAX_LOG_LIMIT: u64 = 1000;

// =============================================================================
// Tool table
// =============================================================================

/// Every tool the server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Push a commit message through mgit
    MgitPush,
    /// Read recent push attempts; arms the push gate
    GetPushHistory,
    /// Page through the operation log
    GetOperationLogs,
}

impl ToolKind {
    /// All tools in listing order.
    pub const ALL: [ToolKind; 3] = [
        ToolKind::MgitPush,
        ToolKind::GetPushHistory,
        ToolKind::GetOperationLogs,
    ];

    /// Unprefixed tool name.
    pub fn base_name(&self) -> &'static str {
        match self {
            ToolKind::MgitPush => "mgit_push",
            ToolKind::GetPushHistory => "get_push_history",
            ToolKind::GetOperationLogs => "get_operation_logs",
        }
    }

    /// Look up an unprefixed tool name.
    pub fn from_base_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.base_name() == name)
    }

    /// Resolve a name as sent by the client, with or without the repository prefix.
    pub fn resolve(config: &ServerConfig, name: &str) -> Option<Self> {
        if config.repo_name.is_empty() {
            return Self::from_base_name(name);
        }
        name.strip_prefix(config.repo_name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(Self::from_base_name)
            .or_else(|| Self::from_base_name(name))
    }

    /// Name as advertised to the client.
    pub fn public_name(&self, config: &ServerConfig) -> String {
        tool_name(config, self.base_name())
    }
}

/// Prefix `base` with the repository identifier when one is configured.
pub fn tool_name(config: &ServerConfig, base: &str) -> String {
    if config.repo_name.is_empty() {
        base.to_string()
    } else {
        format!("{}_{}", config.repo_name, base)
    }
}

// =============================================================================
// Parameters
// =============================================================================

/// Parameters for mgit_push
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MgitPushParams {
    /// Commit message
    pub message: String,
}

/// Parameters for get_push_history
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetPushHistoryParams {}

/// Parameters for get_operation_logs
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetOperationLogsParams {
    /// Limit count, default 50
    #[serde(default)]
    pub limit: Option<u64>,

    /// Offset, default 0
    #[serde(default)]
    pub offset: Option<u64>,
}

// =============================================================================
// Responses
// =============================================================================

/// Response for a push that ran to completion with status 0
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MgitPushResponse {
    /// Always true
    pub success: bool,
    /// Repository pushed to
    pub repo_name: String,
    /// Commit message as supplied
    pub message: String,
    /// Captured standard output
    pub output: String,
    /// Captured standard error
    pub error_output: String,
    /// Exit code of the push command
    pub exit_code: i32,
}

/// Response for get_push_history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushHistoryResponse {
    /// Records in the ledger
    pub total: usize,
    /// Most recent records, newest first
    pub records: Vec<PushRecord>,
    /// Hint for the caller
    pub message: String,
    /// Whether no push has been recorded yet
    pub first_push: bool,
}

/// Response for get_operation_logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLogsResponse {
    /// Requested page, newest first
    pub logs: Vec<OperationLogEntry>,
    /// Entries held in memory
    pub total: usize,
    /// Page size used
    pub limit: u64,
    /// Offset used
    pub offset: u64,
    /// Whether entries exist past this page
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

// =============================================================================
// Descriptors
// =============================================================================

/// One entry of the `tools/list` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Public tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Build descriptors for every tool.
pub fn describe_tools(config: &ServerConfig) -> Vec<ToolDescriptor> {
    ToolKind::ALL
        .into_iter()
        .map(|tool| ToolDescriptor {
            name: tool.public_name(config),
            description: with_project_label(config, &base_description(config, tool)),
            input_schema: tool_schema(config, tool),
        })
        .collect()
}

fn tool_schema(config: &ServerConfig, tool: ToolKind) -> Value {
    match tool {
        ToolKind::MgitPush => {
            let mut schema = input_schema::<MgitPushParams>();
            let language = language_name(&config.language);
            let example = example_message(&config.language);
            if let Some(message) = schema.pointer_mut("/properties/message") {
                message["description"] = Value::String(format!(
                    "Commit message in {language} language. Example: {{message: \"{example}\"}}"
                ));
            }
            schema
        }
        ToolKind::GetPushHistory => input_schema::<GetPushHistoryParams>(),
        ToolKind::GetOperationLogs => input_schema::<GetOperationLogsParams>(),
    }
}

fn base_description(config: &ServerConfig, tool: ToolKind) -> String {
    match tool {
        ToolKind::MgitPush => {
            let history = tool_name(config, ToolKind::GetPushHistory.base_name());
            format!(
                "Execute {cmd} push command for repository \"{repo}\" with a commit message.\n\
                 \n\
                 IMPORTANT:\n\
                 - You must use this tool to push to repositories\n\
                 - You must call {history} first; a push without a fresh history check is rejected\n\
                 - The repository name is configured via REPO_NAME environment variable\n\
                 - Language setting: {lang} (default: en)\n\
                 \n\
                 USAGE: You only need to pass the commit message parameter. Example:\n\
                 {{message: \"{example}\"}}\n\
                 \n\
                 Please provide the commit message in {language} language.\n\
                 \n\
                 NOTE: If the push result contains a branch merge URL (such as a merge request \
                 or pull request URL), please output it to the user. If you can open a browser, \
                 you may also open the URL automatically.",
                cmd = config.mgit_cmd,
                repo = config.repo_name,
                lang = config.language,
                example = example_message(&config.language),
                language = language_name(&config.language),
            )
        }
        ToolKind::GetPushHistory => format!(
            "Get the most recent push attempts for repository \"{}\". \
             Must be called before every {} call to make sure the push is not a duplicate.",
            config.repo_name,
            tool_name(config, ToolKind::MgitPush.base_name()),
        ),
        ToolKind::GetOperationLogs => "Get operation logs".to_string(),
    }
}

fn with_project_label(config: &ServerConfig, description: &str) -> String {
    match config.project_label() {
        Some(project) => format!("[{project}] {description}"),
        None => description.to_string(),
    }
}

/// Language name used in instructions for a `LANGUAGE` code.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "zh" | "zh-CN" => "Chinese",
        "zh-TW" => "Traditional Chinese",
        other => other,
    }
}

/// Example commit message in the configured language.
pub fn example_message(code: &str) -> &'static str {
    match code {
        "zh" | "zh-CN" => "更新项目文件",
        "zh-TW" => "更新專案檔案",
        _ => "Update project files",
    }
}

/// Configuration echoed in the `tools/list` result.
pub fn environment(config: &ServerConfig) -> Value {
    serde_json::json!({
        "MGIT_CMD": config.mgit_cmd,
        "REPO_NAME": config.repo_name,
        "PROJECT_NAME": config.project_name.clone().unwrap_or_default(),
        "LANGUAGE": config.language,
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
    })
}

/// Ordered guidance returned when a push is attempted without a history check.
pub fn denial_segments(config: &ServerConfig) -> Vec<String> {
    let history = tool_name(config, ToolKind::GetPushHistory.base_name());
    let push = tool_name(config, ToolKind::MgitPush.base_name());
    vec![
        "PUSH BLOCKED: push history has not been checked.".to_string(),
        format!("You must call {history} before calling {push}."),
        "Review the returned records to make sure this push does not duplicate a recent one."
            .to_string(),
        format!("After checking the history, call {push} again."),
    ]
}
