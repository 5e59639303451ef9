//! Restart decisions.

use mgit_mcp_core::SupervisorMode;

/// What to do after the worker exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Launch a new worker after the restart delay
    Restart,
    /// Stop supervising and exit with this code
    Exit(i32),
}

/// Tracks crash restarts against the configured bound.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    mode: SupervisorMode,
    max_restarts: u32,
    restarts: u32,
}

impl RestartPolicy {
    /// Create a policy for `mode` allowing `max_restarts` crash restarts.
    pub fn new(mode: SupervisorMode, max_restarts: u32) -> Self {
        Self {
            mode,
            max_restarts,
            restarts: 0,
        }
    }

    /// Crash restarts performed so far.
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Decide after the worker exited. `code` is `None` when it died by signal.
    pub fn on_exit(&mut self, code: Option<i32>) -> ExitDecision {
        match self.mode {
            SupervisorMode::Managed => match code {
                Some(0) => ExitDecision::Exit(0),
                _ => self.crash(),
            },
            // Exit 0 from the worker is a restart request
            SupervisorMode::Cli => match code {
                Some(0) => ExitDecision::Restart,
                Some(code) => ExitDecision::Exit(code),
                None => ExitDecision::Exit(1),
            },
        }
    }

    /// Decide after the worker could not be launched.
    pub fn on_launch_failure(&mut self) -> ExitDecision {
        match self.mode {
            SupervisorMode::Managed => self.crash(),
            SupervisorMode::Cli => ExitDecision::Exit(1),
        }
    }

    fn crash(&mut self) -> ExitDecision {
        if self.restarts < self.max_restarts {
            self.restarts += 1;
            ExitDecision::Restart
        } else {
            ExitDecision::Exit(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_managed_clean_exit_stops() {
        let mut policy = RestartPolicy::new(SupervisorMode::Managed, 10);
        assert_eq!(policy.on_exit(Some(0)), ExitDecision::Exit(0));
        assert_eq!(policy.restarts(), 0);
    }

    #[test]
    fn test_managed_crash_restarts_up_to_bound() {
        let mut policy = RestartPolicy::new(SupervisorMode::Managed, 1);
        assert_eq!(policy.on_exit(Some(7)), ExitDecision::Restart);
        assert_eq!(policy.on_exit(Some(7)), ExitDecision::Exit(1));
        assert_eq!(policy.restarts(), 1);
    }

    #[test]
    fn test_managed_signal_death_is_a_crash() {
        let mut policy = RestartPolicy::new(SupervisorMode::Managed, 2);
        assert_eq!(policy.on_exit(None), ExitDecision::Restart);
    }

    #[test]
    fn test_managed_zero_restarts_gives_up_immediately() {
        let mut policy = RestartPolicy::new(SupervisorMode::Managed, 0);
        assert_eq!(policy.on_exit(Some(1)), ExitDecision::Exit(1));
    }

    #[test]
    fn test_managed_launch_failure_counts_against_bound() {
        let mut policy = RestartPolicy::new(SupervisorMode::Managed, 1);
        assert_eq!(policy.on_launch_failure(), ExitDecision::Restart);
        assert_eq!(policy.on_exit(Some(2)), ExitDecision::Exit(1));
    }

    #[test]
    fn test_cli_zero_exit_is_restart_request() {
        let mut policy = RestartPolicy::new(SupervisorMode::Cli, 0);
        for _ in 0..5 {
            assert_eq!(policy.on_exit(Some(0)), ExitDecision::Restart);
        }
        assert_eq!(policy.restarts(), 0);
    }

    #[test]
    fn test_cli_propagates_exit_code() {
        let mut policy = RestartPolicy::new(SupervisorMode::Cli, 10);
        assert_eq!(policy.on_exit(Some(42)), ExitDecision::Exit(42));
    }

    #[test]
    fn test_cli_signal_death_and_launch_failure_are_fatal() {
        let mut policy = RestartPolicy::new(SupervisorMode::Cli, 10);
        assert_eq!(policy.on_exit(None), ExitDecision::Exit(1));
        assert_eq!(policy.on_launch_failure(), ExitDecision::Exit(1));
    }
}
