//! External push command execution.

use std::process::Stdio;

use async_trait::async_trait;
use mgit_mcp_core::{Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Subcommand passed as the first positional argument.
const PUSH_SUBCOMMAND: &str = "push";

/// Output of a push that exited with status 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Exit code (always 0)
    pub exit_code: i32,
}

/// Something that can push a commit message to a repository.
///
/// Implementations return [`Error::Launch`] when the command cannot be started
/// and [`Error::PushFailed`] when it exits unsuccessfully.
#[async_trait]
pub trait PushExecutor: Send + Sync {
    /// Push `message` to `repo_name`.
    async fn push(&self, repo_name: &str, message: &str) -> Result<PushOutput>;
}

/// Replace double quotes with single quotes.
///
/// No shell is involved; this only keeps the downstream tool's own argument
/// parsing unambiguous.
pub fn sanitize_message(message: &str) -> String {
    message.replace('"', "'")
}

/// Executor backed by the real `mgit` (or `MGIT_CMD`) program.
#[derive(Debug, Clone)]
pub struct MgitExecutor {
    program: String,
    relay_output: bool,
}

impl MgitExecutor {
    /// Create an executor for `program`, relaying child output to stderr.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            relay_output: true,
        }
    }

    /// Capture child output without copying it to stderr.
    pub fn quiet(mut self) -> Self {
        self.relay_output = false;
        self
    }

    /// Program this executor runs.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl PushExecutor for MgitExecutor {
    #[instrument(skip_all, fields(program = %self.program, repo = %repo_name))]
    async fn push(&self, repo_name: &str, message: &str) -> Result<PushOutput> {
        let message = sanitize_message(message);
        info!(
            "Executing: {} {} {} {}",
            self.program,
            PUSH_SUBCOMMAND,
            repo_name,
            quote_if_spaced(&message)
        );

        let mut child = Command::new(&self.program)
            .arg(PUSH_SUBCOMMAND)
            .arg(repo_name)
            .arg(&message)
            // stdin carries RPC traffic; the child must not read it
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An abandoned push keeps running to completion
            .spawn()
            .map_err(|source| Error::Launch {
                program: self.program.clone(),
                source,
            })?;

        let (stdout, stderr) = tokio::join!(
            relay(child.stdout.take(), self.relay_output),
            relay(child.stderr.take(), self.relay_output),
        );
        let status = child.wait().await?;
        let stdout = stdout?;
        let stderr = stderr?;

        match status.code() {
            Some(0) => {
                debug!("Push succeeded ({} bytes of output)", stdout.len());
                Ok(PushOutput {
                    stdout,
                    stderr,
                    exit_code: 0,
                })
            }
            exit_code => {
                warn!("Push command failed: {:?}", exit_code);
                Err(Error::PushFailed {
                    exit_code,
                    stdout,
                    stderr,
                })
            }
        }
    }
}

/// Read a child stream to the end, copying each chunk to stderr as it arrives.
async fn relay<R>(stream: Option<R>, echo: bool) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(String::new());
    };

    let mut captured = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut diagnostics = tokio::io::stderr();
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&chunk[..n]);
        if echo {
            // Diagnostics are best effort
            let _ = diagnostics.write_all(&chunk[..n]).await;
        }
    }
    Ok(String::from_utf8_lossy(&captured).into_owned())
}

fn quote_if_spaced(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sanitize_replaces_double_quotes() {
        assert_eq!(
            sanitize_message(r#"fix "quoted" thing"#),
            "fix 'quoted' thing"
        );
        assert_eq!(sanitize_message("plain"), "plain");
    }

    #[test]
    fn test_quote_if_spaced() {
        assert_eq!(quote_if_spaced("fix bug"), "\"fix bug\"");
        assert_eq!(quote_if_spaced("fix"), "fix");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_push_success_captures_stdout() {
        let executor = MgitExecutor::new("echo").quiet();
        let output = executor.push("demo", "fix bug").await.unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "push demo fix bug\n");
        assert!(output.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_message_is_one_sanitized_argument() {
        let executor = MgitExecutor::new("echo").quiet();
        let output = executor.push("demo", r#"say "hi""#).await.unwrap();
        assert_eq!(output.stdout, "push demo say 'hi'\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_push_failure() {
        let executor = MgitExecutor::new("false").quiet();
        let err = executor.push("demo", "fix bug").await.unwrap_err();
        match err {
            Error::PushFailed { exit_code, .. } => assert_eq!(exit_code, Some(1)),
            other => panic!("expected PushFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relayed_output_is_still_captured() {
        let executor = MgitExecutor::new("echo");
        let output = executor.push("demo", "relay me").await.unwrap();
        assert_eq!(output.stdout, "push demo relay me\n");
        assert_eq!(output.exit_code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_abandoned_push_runs_to_completion() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("pushed");
        let script = dir.path().join("slow-mgit");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nsleep 1\ntouch '{}'\n", marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let executor = MgitExecutor::new(script.to_string_lossy()).quiet();
        let push = executor.push("demo", "slow");
        assert!(tokio::time::timeout(Duration::from_millis(200), push)
            .await
            .is_err());

        tokio::time::sleep(Duration::from_millis(1800)).await;
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_failure() {
        let executor = MgitExecutor::new("mgit-definitely-not-installed-here").quiet();
        let err = executor.push("demo", "fix bug").await.unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
        assert!(err.to_string().contains("mgit-definitely-not-installed-here"));
    }
}
