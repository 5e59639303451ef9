//! # MGit MCP Server
//!
//! Model Context Protocol worker exposing a history-gated `mgit push` to AI
//! agents over line-delimited JSON-RPC on stdin/stdout.
//!
//! ## Overview
//!
//! This server provides MCP tools for:
//! - Pushing a commit message (`<repo>_mgit_push`)
//! - Reading recent pushes, required before every push (`<repo>_get_push_history`)
//! - Paging through the operation log (`<repo>_get_operation_logs`)
//!
//! Diagnostics go to stderr; stdout carries nothing but response envelopes.

use std::path::PathBuf;
use std::sync::Arc;

use mgit_mcp::protocol::{record_uncaught, SHUTDOWN_GRACE};
use mgit_mcp::{Disposition, MgitMcpServer, ServerContext, SERVER_NAME, SERVER_VERSION};
use mgit_mcp_core::{Error, ServerConfig, REPO_NAME_HELP};
use mgit_mcp_executor::MgitExecutor;
use mgit_mcp_journal::{OperationLog, PushLedger};
use serde_json::json;
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            if matches!(&e, Error::Config(msg) if msg.contains("REPO_NAME")) {
                eprintln!("{REPO_NAME_HELP}");
            }
            std::process::exit(1);
        }
    };

    // Initialize logging; stdout is reserved for responses
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = config.log_paths();
    install_panic_hook(paths.operation_log.clone());

    tracing::info!(
        "MGit MCP Server v{} starting: repository={}, command={}, language={}",
        SERVER_VERSION,
        config.repo_name,
        config.mgit_cmd,
        config.language
    );
    if let Some(project) = config.project_label() {
        tracing::info!("Project: {}", project);
    }
    tracing::info!(
        "Log directory: {}, log file: {}, push history: {}",
        paths.dir.display(),
        paths.operation_log.display(),
        paths.push_history.display()
    );
    if let Err(e) = std::fs::create_dir_all(&paths.dir) {
        tracing::warn!("Failed to create log directory {}: {}", paths.dir.display(), e);
    }

    let executor = Arc::new(MgitExecutor::new(config.mgit_cmd.clone()));
    let oplog = OperationLog::new(Some(paths.operation_log.clone()));
    let ledger = PushLedger::open(&paths.push_history);
    let mut server = MgitMcpServer::new(ServerContext::new(config, oplog, ledger, executor));

    server.record_event(
        "server_start",
        json!({
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "logDir": paths.dir,
            "logFile": paths.operation_log,
        }),
        json!({ "status": "started" }),
    );

    let mut terminate = terminate_signal()?;
    let shutdown = async move {
        tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            _ = tokio::signal::ctrl_c() => "SIGINT",
        }
    };
    let disposition = server
        .serve_until(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
        .await?;

    if disposition == Disposition::Shutdown {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
    }

    tracing::info!("MGit MCP Server shutting down");
    // Stdin is read on a blocking thread that would otherwise keep the runtime alive
    std::process::exit(0);
}

#[cfg(unix)]
fn terminate_signal() -> std::io::Result<tokio::signal::unix::Signal> {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
}

/// Stand-in that never fires where SIGTERM does not exist.
#[cfg(not(unix))]
fn terminate_signal() -> std::io::Result<NeverSignal> {
    Ok(NeverSignal)
}

#[cfg(not(unix))]
struct NeverSignal;

#[cfg(not(unix))]
impl NeverSignal {
    async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}

/// Log the panic, to stderr and to the operation log file, and exit nonzero so
/// the supervisor restarts the worker.
fn install_panic_hook(operation_log: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let message = info.to_string();
        tracing::error!("Worker panicked: {}", message);
        record_uncaught(operation_log.clone(), &message);
        default_hook(info);
        std::process::exit(1);
    }));
}
