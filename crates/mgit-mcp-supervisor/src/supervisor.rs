//! Worker lifecycle loop.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mgit_mcp_core::{Error, Result, SupervisorMode, SupervisorSettings};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::policy::{ExitDecision, RestartPolicy};
use crate::signal::{ForwardSignal, SupervisorSignal};

/// Time a worker gets to exit during a CLI-mode restart.
const RESTART_GRACE: Duration = Duration::from_secs(3);

/// How to launch the worker process.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments passed to the program
    pub args: Vec<OsString>,
    /// Environment variables set on top of the inherited environment
    pub envs: Vec<(String, String)>,
}

impl WorkerSpec {
    /// Spec for `program` with no arguments or extra environment.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replace the extra environment.
    pub fn envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs = envs;
        self
    }
}

/// Final outcome of a supervision run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorExit {
    /// Exit code for the supervisor process
    pub code: i32,
    /// Launch attempts, successful or not
    pub launches: u32,
    /// Crash restarts counted against the bound
    pub restarts: u32,
}

/// Keeps one worker process running according to a [`RestartPolicy`].
#[derive(Debug)]
pub struct Supervisor {
    spec: WorkerSpec,
    mode: SupervisorMode,
    policy: RestartPolicy,
    restart_delay: Duration,
    shutdown_timeout: Duration,
    restart_grace: Duration,
    worker_pid: Arc<AtomicU32>,
    launches: u32,
}

enum Outcome {
    Exited(Option<i32>),
    Replace,
    Finished(SupervisorExit),
}

impl Supervisor {
    /// Create a supervisor for `spec`.
    pub fn new(spec: WorkerSpec, mode: SupervisorMode, settings: &SupervisorSettings) -> Self {
        Self {
            spec,
            mode,
            policy: RestartPolicy::new(mode, settings.max_restarts),
            restart_delay: Duration::from_millis(settings.restart_delay_ms),
            shutdown_timeout: Duration::from_millis(settings.shutdown_timeout_ms),
            restart_grace: RESTART_GRACE,
            worker_pid: Arc::new(AtomicU32::new(0)),
            launches: 0,
        }
    }

    /// Override the grace period used for CLI-mode restarts.
    pub fn with_restart_grace(mut self, grace: Duration) -> Self {
        self.restart_grace = grace;
        self
    }

    /// Shared handle holding the running worker's pid, 0 when none is running.
    pub fn worker_pid(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.worker_pid)
    }

    /// Supervise until the policy or a shutdown signal ends the run.
    ///
    /// Returns `Err` only when the worker's status can no longer be observed;
    /// the worker has been sent SIGTERM by then.
    #[instrument(skip_all, fields(mode = %self.mode))]
    pub async fn run(
        &mut self,
        signals: &mut mpsc::UnboundedReceiver<SupervisorSignal>,
    ) -> Result<SupervisorExit> {
        info!("Starting {} supervisor", self.mode);

        loop {
            let decision = match self.launch() {
                Ok(child) => match self.watch(child, signals).await? {
                    Outcome::Finished(exit) => return Ok(exit),
                    Outcome::Replace => continue,
                    Outcome::Exited(code) => {
                        info!("Server exited with code {:?}", code);
                        self.policy.on_exit(code)
                    }
                },
                Err(e) => {
                    error!("Failed to start server: {}", e);
                    self.policy.on_launch_failure()
                }
            };

            match decision {
                ExitDecision::Exit(code) => {
                    if code != 0 {
                        error!(
                            "Supervisor giving up after {} restart(s), exiting with code {}",
                            self.policy.restarts(),
                            code
                        );
                    }
                    return Ok(self.finish(code));
                }
                ExitDecision::Restart => {
                    info!(
                        "Restarting server in {}ms (restart {})",
                        self.restart_delay.as_millis(),
                        self.policy.restarts()
                    );
                    if let Some(signal) = self.pause(signals).await {
                        info!("Received {} while waiting to restart, exiting", signal);
                        return Ok(self.finish(0));
                    }
                }
            }
        }
    }

    fn launch(&mut self) -> Result<Child> {
        self.launches += 1;
        info!(
            "Launching server: {} (attempt {})",
            self.spec.program.display(),
            self.launches
        );

        let child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .envs(self.spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::Launch {
                program: self.spec.program.display().to_string(),
                source,
            })?;

        let pid = child.id().unwrap_or(0);
        self.worker_pid.store(pid, Ordering::SeqCst);
        info!("Server started with PID {}", pid);
        Ok(child)
    }

    async fn watch(
        &mut self,
        mut child: Child,
        signals: &mut mpsc::UnboundedReceiver<SupervisorSignal>,
    ) -> Result<Outcome> {
        loop {
            let signal = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => {
                        self.worker_pid.store(0, Ordering::SeqCst);
                        return Ok(Outcome::Exited(status.code()));
                    }
                    Err(e) => Err(e),
                },
                Some(signal) = signals.recv() => Ok(signal),
            };

            let signal = match signal {
                Ok(signal) => signal,
                Err(e) => {
                    error!("Lost track of server process: {}", e);
                    if let Err(e) = forward(&mut child, ForwardSignal::Terminate) {
                        warn!("Failed to signal server: {}", e);
                    }
                    self.worker_pid.store(0, Ordering::SeqCst);
                    return Err(e.into());
                }
            };

            match signal {
                SupervisorSignal::Shutdown(signal) => {
                    return Ok(Outcome::Finished(self.shutdown(child, signal).await));
                }
                SupervisorSignal::Restart if self.mode == SupervisorMode::Cli => {
                    self.replace(child).await;
                    return Ok(Outcome::Replace);
                }
                SupervisorSignal::Restart => {
                    warn!("Restart signal ignored in {} mode", self.mode);
                }
            }
        }
    }

    /// Forward `signal` and give the worker the shutdown timeout to exit.
    async fn shutdown(&mut self, mut child: Child, signal: ForwardSignal) -> SupervisorExit {
        info!("Received {}, shutting down server...", signal);

        if let Err(e) = forward(&mut child, signal) {
            error!("Failed to forward {} to server: {}", signal, e);
            self.worker_pid.store(0, Ordering::SeqCst);
            return self.finish(1);
        }

        let code = match tokio::time::timeout(self.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Server exited with code {:?}", status.code());
                0
            }
            Ok(Err(e)) => {
                error!("Lost track of server process: {}", e);
                1
            }
            Err(_) => {
                warn!("Server shutdown timeout, forcing exit...");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill server: {}", e);
                }
                1
            }
        };
        self.worker_pid.store(0, Ordering::SeqCst);
        self.finish(code)
    }

    /// Stop the worker for a CLI-mode restart.
    async fn replace(&mut self, mut child: Child) {
        info!("Received restart signal, restarting server...");
        if let Err(e) = forward(&mut child, ForwardSignal::Terminate) {
            warn!("Failed to signal server: {}", e);
        }
        if tokio::time::timeout(self.restart_grace, child.wait())
            .await
            .is_err()
        {
            warn!("Server did not exit within grace period, killing");
            if let Err(e) = child.kill().await {
                error!("Failed to kill server: {}", e);
            }
        }
        self.worker_pid.store(0, Ordering::SeqCst);
    }

    /// Wait out the restart delay. Returns the signal if shutdown was requested.
    async fn pause(
        &mut self,
        signals: &mut mpsc::UnboundedReceiver<SupervisorSignal>,
    ) -> Option<ForwardSignal> {
        let delay = tokio::time::sleep(self.restart_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return None,
                Some(signal) = signals.recv() => {
                    if let SupervisorSignal::Shutdown(signal) = signal {
                        return Some(signal);
                    }
                }
            }
        }
    }

    fn finish(&self, code: i32) -> SupervisorExit {
        SupervisorExit {
            code,
            launches: self.launches,
            restarts: self.policy.restarts(),
        }
    }
}

#[cfg(unix)]
fn forward(child: &mut Child, signal: ForwardSignal) -> std::io::Result<()> {
    match child.id() {
        Some(pid) => crate::signal::send(pid, signal),
        // Already reaped
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn forward(child: &mut Child, _signal: ForwardSignal) -> std::io::Result<()> {
    child.start_kill()
}
