//! Signals the supervisor reacts to and forwards to its worker.

use std::fmt;

use mgit_mcp_core::SupervisorMode;
use tokio::sync::mpsc;
use tracing::debug;

/// Signal delivered to the worker on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl ForwardSignal {
    /// Raw signal number.
    #[cfg(unix)]
    pub fn as_raw(&self) -> libc::c_int {
        match self {
            ForwardSignal::Interrupt => libc::SIGINT,
            ForwardSignal::Terminate => libc::SIGTERM,
        }
    }
}

impl fmt::Display for ForwardSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardSignal::Interrupt => write!(f, "SIGINT"),
            ForwardSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Event the supervisor loop acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorSignal {
    /// Forward the signal, wait for the worker, then exit
    Shutdown(ForwardSignal),
    /// Replace the running worker without counting a restart (CLI mode)
    Restart,
}

/// Deliver `signal` to process `pid`.
#[cfg(unix)]
pub fn send(pid: u32, signal: ForwardSignal) -> std::io::Result<()> {
    // SAFETY: kill has no memory-safety preconditions
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal.as_raw()) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Subscribe to process signals.
///
/// SIGINT and SIGTERM map to a shutdown forwarding the same signal, SIGHUP to
/// a shutdown forwarding SIGTERM, and SIGUSR1 (CLI mode only) to a restart.
#[cfg(unix)]
pub fn listen(mode: SupervisorMode) -> std::io::Result<mpsc::UnboundedReceiver<SupervisorSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigusr1 = match mode {
        SupervisorMode::Cli => Some(signal(SignalKind::user_defined1())?),
        SupervisorMode::Managed => None,
    };

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(()) = sigint.recv() => SupervisorSignal::Shutdown(ForwardSignal::Interrupt),
                Some(()) = sigterm.recv() => SupervisorSignal::Shutdown(ForwardSignal::Terminate),
                Some(()) = sighup.recv() => SupervisorSignal::Shutdown(ForwardSignal::Terminate),
                Some(()) = restart_requested(&mut sigusr1) => SupervisorSignal::Restart,
                else => break,
            };
            debug!("Signal received: {:?}", event);
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

#[cfg(unix)]
async fn restart_requested(signal: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match signal {
        Some(signal) => signal.recv().await,
        None => std::future::pending().await,
    }
}

/// Subscribe to process signals (Ctrl+C only).
#[cfg(not(unix))]
pub fn listen(_mode: SupervisorMode) -> std::io::Result<mpsc::UnboundedReceiver<SupervisorSignal>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx
                .send(SupervisorSignal::Shutdown(ForwardSignal::Interrupt))
                .is_err()
            {
                break;
            }
        }
    });
    Ok(rx)
}
