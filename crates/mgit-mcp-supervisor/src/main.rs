//! # MGit MCP Supervisor
//!
//! Launches the `mgit-mcp-server` worker with inherited standard streams and
//! keeps it running.
//!
//! ## Modes
//!
//! - Managed (default): a clean exit ends supervision, crashes are restarted
//!   up to `MCP_MAX_RESTARTS` times.
//! - CLI (`--cli`): a clean exit is a restart request, any other exit code is
//!   propagated, SIGUSR1 replaces the running worker.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use mgit_mcp_core::{Error, ServerConfig, SupervisorMode, REPO_NAME_HELP};
use mgit_mcp_supervisor::{signal, Supervisor, WorkerSpec};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const WORKER_BIN: &str = "mgit-mcp-server";

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mode = if args.iter().any(|arg| arg == "--cli") {
        SupervisorMode::Cli
    } else {
        SupervisorMode::Managed
    };

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

    init_logging(&config, mode);

    let code = match run(config, mode).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Supervisor failed: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(config: ServerConfig, mode: SupervisorMode) -> anyhow::Result<i32> {
    let program = worker_program(&config)?;
    if !program.exists() {
        anyhow::bail!("Server file not found: {}", program.display());
    }

    tracing::info!(
        "MGit MCP supervisor v{} starting in {} mode for repository {}",
        env!("CARGO_PKG_VERSION"),
        mode,
        config.repo_name
    );

    let spec = WorkerSpec::new(program).envs(config.worker_env());
    let mut supervisor = Supervisor::new(spec, mode, &config.supervisor);
    install_panic_hook(supervisor.worker_pid());

    let mut signals = signal::listen(mode).context("Failed to install signal handlers")?;
    let exit = supervisor.run(&mut signals).await?;

    tracing::info!(
        "Supervisor exiting with code {} after {} launch(es)",
        exit.code,
        exit.launches
    );
    Ok(exit.code)
}

/// `MGIT_MCP_SERVER_BIN`, or the worker binary installed next to this one.
fn worker_program(config: &ServerConfig) -> anyhow::Result<PathBuf> {
    if let Some(bin) = &config.supervisor.server_bin {
        return Ok(bin.clone());
    }
    let exe = std::env::current_exe().context("Failed to locate supervisor executable")?;
    Ok(exe.with_file_name(format!("{}{}", WORKER_BIN, std::env::consts::EXE_SUFFIX)))
}

fn init_logging(config: &ServerConfig, mode: SupervisorMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = config.log_paths().dir.join(mode.log_file_name());
    let file_layer = match open_log(&log_path) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        ),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", log_path.display(), e);
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn open_log(path: &Path) -> std::io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Terminate the worker before the supervisor dies of a panic.
fn install_panic_hook(worker_pid: Arc<AtomicU32>) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        let pid = worker_pid.load(Ordering::SeqCst);
        #[cfg(unix)]
        {
            if pid != 0 {
                let _ = signal::send(pid, mgit_mcp_supervisor::ForwardSignal::Terminate);
            }
        }
        #[cfg(not(unix))]
        let _ = pid;
        std::process::exit(1);
    }));
}
