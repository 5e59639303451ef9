//! Configuration types for the MGit MCP server.
//!
//! Configuration is read once at startup and stays immutable for the life of
//! the process. Sources, lowest precedence first: built-in defaults, an
//! optional YAML file named by `MGIT_MCP_CONFIG`, environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_FILE_ENV: &str = "MGIT_MCP_CONFIG";

/// Printed when the worker or supervisor starts without a repository.
pub const REPO_NAME_HELP: &str = "Set REPO_NAME before starting the server, for example:
  export REPO_NAME=\"my-repo\"
Run \"mgit list\" (or \"$MGIT_CMD list\") to see available repository names.";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Repository identifier passed to the push command (`REPO_NAME`)
    pub repo_name: String,
    /// External command name (`MGIT_CMD`)
    pub mgit_cmd: String,
    /// Optional project label prefixed to tool descriptions (`PROJECT_NAME`)
    pub project_name: Option<String>,
    /// Response-language hint (`LANGUAGE`)
    pub language: String,
    /// Log directory override (`MCP_LOG_DIR`)
    pub log_dir: Option<PathBuf>,
    /// Operation log file name (`MCP_LOG_FILE`)
    pub log_file: String,
    /// Push ledger file override (`MCP_PUSH_HISTORY_FILE`)
    pub push_history_file: Option<PathBuf>,
    /// Supervisor settings
    pub supervisor: SupervisorSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            repo_name: String::new(),
            mgit_cmd: "mgit".to_string(),
            project_name: None,
            language: "en".to_string(),
            log_dir: None,
            log_file: "mcp-mgit.log".to_string(),
            push_history_file: None,
            supervisor: SupervisorSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Reads the YAML file named by `MGIT_MCP_CONFIG` if set, overlays the
    /// environment variables, and validates the result.
    pub fn load() -> crate::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match non_empty(lookup(CONFIG_FILE_ENV)) {
            Some(path) => Self::parse_file(path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: ServerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Overlay environment variables. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(repo) = get("REPO_NAME") {
            self.repo_name = repo;
        }
        if let Some(cmd) = get("MGIT_CMD") {
            self.mgit_cmd = cmd;
        }
        if let Some(project) = get("PROJECT_NAME") {
            self.project_name = Some(project);
        }
        if let Some(language) = get("LANGUAGE") {
            self.language = language;
        }
        if let Some(dir) = get("MCP_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(file) = get("MCP_LOG_FILE") {
            self.log_file = file;
        }
        if let Some(file) = get("MCP_PUSH_HISTORY_FILE") {
            self.push_history_file = Some(PathBuf::from(file));
        }
        if let Some(bin) = get("MGIT_MCP_SERVER_BIN") {
            self.supervisor.server_bin = Some(PathBuf::from(bin));
        }
        if let Some(value) = get("MCP_MAX_RESTARTS") {
            self.supervisor.max_restarts = parse_number("MCP_MAX_RESTARTS", &value)?;
        }
        if let Some(value) = get("MCP_RESTART_DELAY_MS") {
            self.supervisor.restart_delay_ms = parse_number("MCP_RESTART_DELAY_MS", &value)?;
        }
        if let Some(value) = get("MCP_SHUTDOWN_TIMEOUT_MS") {
            self.supervisor.shutdown_timeout_ms =
                parse_number("MCP_SHUTDOWN_TIMEOUT_MS", &value)?;
        }
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.repo_name.trim().is_empty() {
            return Err(crate::Error::Config(
                "REPO_NAME environment variable is required but not set".to_string(),
            ));
        }

        if self.mgit_cmd.trim().is_empty() {
            return Err(crate::Error::Config(
                "MGIT_CMD must not be empty".to_string(),
            ));
        }

        if self.log_file.trim().is_empty() {
            return Err(crate::Error::Config(
                "MCP_LOG_FILE must not be empty".to_string(),
            ));
        }

        if self.supervisor.shutdown_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "supervisor.shutdown_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Project label, if one is configured and non-blank.
    pub fn project_label(&self) -> Option<&str> {
        self.project_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Resolve the on-disk locations derived from this configuration.
    pub fn log_paths(&self) -> LogPaths {
        let dir = self.log_dir.clone().unwrap_or_else(|| {
            if self.repo_name.is_empty() {
                PathBuf::from("./.setting")
            } else {
                PathBuf::from(format!("./.setting.{}", self.repo_name))
            }
        });
        let operation_log = dir.join(&self.log_file);
        let push_history = self
            .push_history_file
            .clone()
            .unwrap_or_else(|| dir.join("push-history.json"));
        LogPaths {
            dir,
            operation_log,
            push_history,
        }
    }

    /// Environment handed to a supervised worker, with derived values made explicit.
    pub fn worker_env(&self) -> Vec<(String, String)> {
        let paths = self.log_paths();
        vec![
            ("MGIT_CMD".to_string(), self.mgit_cmd.clone()),
            ("REPO_NAME".to_string(), self.repo_name.clone()),
            (
                "PROJECT_NAME".to_string(),
                self.project_name.clone().unwrap_or_default(),
            ),
            ("LANGUAGE".to_string(), self.language.clone()),
            (
                "MCP_LOG_DIR".to_string(),
                paths.dir.to_string_lossy().into_owned(),
            ),
            ("MCP_LOG_FILE".to_string(), self.log_file.clone()),
            (
                "MCP_PUSH_HISTORY_FILE".to_string(),
                paths.push_history.to_string_lossy().into_owned(),
            ),
        ]
    }
}

/// On-disk locations used by the server and supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    /// Log directory
    pub dir: PathBuf,
    /// Append-only operation log
    pub operation_log: PathBuf,
    /// Push ledger JSON document
    pub push_history: PathBuf,
}

/// Supervisor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorSettings {
    /// Crash restarts allowed before giving up (managed mode)
    pub max_restarts: u32,
    /// Delay before relaunching the worker, in milliseconds
    pub restart_delay_ms: u64,
    /// Time the worker gets to exit after a forwarded signal, in milliseconds
    pub shutdown_timeout_ms: u64,
    /// Worker binary; defaults to `mgit-mcp-server` next to the supervisor
    pub server_bin: Option<PathBuf>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            max_restarts: 10,
            restart_delay_ms: 2000,
            shutdown_timeout_ms: 10_000,
            server_bin: None,
        }
    }
}

/// How the supervisor interprets worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorMode {
    /// Exit 0 ends supervision; crashes restart up to the bound
    #[default]
    Managed,
    /// Exit 0 is a restart request; a crash ends supervision with the same code
    Cli,
}

impl SupervisorMode {
    /// File name of the supervisor's own log in this mode.
    pub fn log_file_name(&self) -> &'static str {
        match self {
            SupervisorMode::Managed => "mcp-mgit-managed.log",
            SupervisorMode::Cli => "mcp-mgit-cli.log",
        }
    }
}

impl std::fmt::Display for SupervisorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorMode::Managed => write!(f, "managed"),
            SupervisorMode::Cli => write!(f, "cli"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> crate::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| crate::Error::Config(format!("{key} must be a number, got '{value}'")))
}
