//! Hypervisor command gateway: the only code that starts `VBoxManage`.
//!
//! Everything above this module talks to the hypervisor through the
//! [`HypervisorGateway`] trait, so the orchestrator and the screenshot
//! service can be tested against [`ScriptedGateway`](super::scripted::ScriptedGateway)
//! without a VirtualBox installation.
//!
//! # No shell, ever
//!
//! [`VBoxManageGateway`] hands the argument vector straight to the OS process
//! launcher.  There is no `sh -c`, so a VM name such as `"x; rm -rf /"` or key
//! text full of `$()` reaches `VBoxManage` as one literal argument.
//!
//! # Timeouts
//!
//! Each call carries its own timeout.  The child is spawned with
//! `kill_on_drop(true)`; when the timeout fires, the future owning the child
//! is dropped and Tokio kills the process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// A zero-exit result carrying `stdout`.
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: Vec::new(),
            exit_code: Some(0),
        }
    }

    /// Standard output decoded as UTF-8, replacing invalid sequences.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Coarse classification of gateway failures, surfaced to callers as `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    NotFound,
    Timeout,
    NonZeroExit,
    IoFailure,
}

impl GatewayErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayErrorKind::NotFound => "NotFound",
            GatewayErrorKind::Timeout => "Timeout",
            GatewayErrorKind::NonZeroExit => "NonZeroExit",
            GatewayErrorKind::IoFailure => "IOFailure",
        }
    }
}

/// Failure of a single hypervisor CLI invocation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The program could not be found on `PATH` (or at the configured path).
    #[error("hypervisor CLI not found: {program}")]
    NotFound { program: String },

    /// The process did not exit in time and was killed.
    #[error("hypervisor CLI timed out after {after:?}")]
    Timeout { after: Duration },

    /// The process exited unsuccessfully; `stderr` is its error output verbatim.
    #[error("hypervisor CLI exited with {}: {stderr}", describe_code(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// Spawning or waiting on the process failed for another reason.
    #[error("I/O error running hypervisor CLI: {0}")]
    Io(#[source] std::io::Error),
}

impl GatewayError {
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::NotFound { .. } => GatewayErrorKind::NotFound,
            GatewayError::Timeout { .. } => GatewayErrorKind::Timeout,
            GatewayError::NonZeroExit { .. } => GatewayErrorKind::NonZeroExit,
            GatewayError::Io(_) => GatewayErrorKind::IoFailure,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Executes one hypervisor CLI invocation.
///
/// `args` excludes the program name.  The caller is suspended until the
/// process exits or `timeout` elapses.
#[async_trait]
pub trait HypervisorGateway: Send + Sync {
    async fn execute(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, GatewayError>;
}

/// Gateway backed by a real `VBoxManage` process.
#[derive(Debug, Clone)]
pub struct VBoxManageGateway {
    program: PathBuf,
}

impl VBoxManageGateway {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl HypervisorGateway for VBoxManageGateway {
    async fn execute(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, GatewayError> {
        debug!(program = %self.program.display(), ?args, "invoking hypervisor CLI");

        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GatewayError::NotFound {
                    program: self.program.display().to_string(),
                },
                _ => GatewayError::Io(e),
            })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(GatewayError::Io)?,
            Err(_elapsed) => {
                // Dropping the wait future dropped the child, which kills it.
                warn!(?args, ?timeout, "hypervisor CLI timed out; process killed");
                return Err(GatewayError::Timeout { after: timeout });
            }
        };

        if output.status.success() {
            Ok(CommandOutput {
                stdout: output.stdout,
                stderr: output.stderr,
                exit_code: output.status.code(),
            })
        } else {
            Err(GatewayError::NonZeroExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kind_names_match_wire_vocabulary() {
        assert_eq!(GatewayErrorKind::IoFailure.as_str(), "IOFailure");
        assert_eq!(GatewayErrorKind::NonZeroExit.as_str(), "NonZeroExit");
    }

    #[test]
    fn test_non_zero_exit_message_carries_stderr_verbatim() {
        let err = GatewayError::NonZeroExit {
            code: Some(1),
            stderr: "VBoxManage: error: Could not find a registered machine named 'x'".into(),
        };
        assert_eq!(
            err.to_string(),
            "hypervisor CLI exited with status 1: VBoxManage: error: Could not find a registered machine named 'x'"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_not_found() {
        let gateway = VBoxManageGateway::new("vbox-web-test-no-such-program");
        let err = gateway
            .execute(&args(&["list", "vms"]), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GatewayErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arguments_are_not_interpreted_by_a_shell() {
        // Arrange: metacharacters that a shell would expand or split on
        let gateway = VBoxManageGateway::new("echo");

        // Act
        let out = gateway
            .execute(&args(&["a; ls", "$(whoami)", "`id`"]), Duration::from_secs(5))
            .await
            .unwrap();

        // Assert: echo printed them literally
        assert_eq!(out.stdout_text(), "a; ls $(whoami) `id`\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_is_non_zero_exit() {
        let gateway = VBoxManageGateway::new("false");
        let err = gateway
            .execute(&[], Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GatewayErrorKind::NonZeroExit);
        assert!(matches!(err, GatewayError::NonZeroExit { code: Some(1), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let gateway = VBoxManageGateway::new("sleep");
        let started = std::time::Instant::now();

        let err = gateway
            .execute(&args(&["5"]), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), GatewayErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_process_is_killed() {
        // Arrange: a child that would leave a marker file after half a second
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-running");
        let script = format!("sleep 0.5; touch '{}'", marker.display());
        let gateway = VBoxManageGateway::new("sh");

        // Act
        let err = gateway
            .execute(&args(&["-c", &script]), Duration::from_millis(100))
            .await
            .unwrap_err();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        // Assert: the child never got as far as writing the marker
        assert_eq!(err.kind(), GatewayErrorKind::Timeout);
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_program_captures_stdout() {
        let gateway = VBoxManageGateway::new("printf");
        let out = gateway
            .execute(&args(&["%s", "\"dev\" {1234}"]), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, b"\"dev\" {1234}".to_vec());
        assert_eq!(out.exit_code, Some(0));
    }
}
