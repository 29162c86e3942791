//! External process execution behind a capability interface.
//!
//! Every invocation runs the privileged firewall binary through sudo and
//! must be treated as a non-sandboxed operation on real host state. Tests
//! substitute a fake [`CommandRunner`] that returns canned output.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;

/// Captured output of a completed process. Trailing whitespace is preserved;
/// trimming is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// sudo (or the target binary) is not present on the host.
    #[error("ufw command not found")]
    NotFound,

    /// The process ran and exited non-zero. Whether that is an expected
    /// outcome is the caller's call; ufw does not use exit codes
    /// consistently.
    #[error("{stderr}")]
    NonZeroExit { stderr: String },

    #[error("command execution failed: {0}")]
    Io(String),

    /// The bounded wait expired. The process itself is not killed.
    #[error("ufw command timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability interface over privileged command execution.
pub trait CommandRunner: Send + Sync + 'static {
    /// Run `args` (the target binary path followed by its arguments),
    /// optionally feeding `stdin` to the process, and capture its output.
    fn run(&self, args: &[String], stdin: Option<&str>) -> Result<CommandOutput, ExecError>;
}

/// Production runner: prepends the configured sudo path and executes the
/// argument vector as a real process.
#[derive(Debug, Clone)]
pub struct SudoCommandRunner {
    sudo_path: String,
}

impl SudoCommandRunner {
    pub fn new(sudo_path: impl Into<String>) -> Self {
        Self {
            sudo_path: sudo_path.into(),
        }
    }
}

impl CommandRunner for SudoCommandRunner {
    fn run(&self, args: &[String], stdin: Option<&str>) -> Result<CommandOutput, ExecError> {
        let mut command = Command::new(&self.sudo_path);
        command
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecError::NotFound
            } else {
                ExecError::Io(e.to_string())
            }
        })?;

        if let Some(input) = stdin {
            if let Some(mut handle) = child.stdin.take() {
                // A child that never reads the confirmation may close its
                // end (or exit) before the write lands; its exit status is
                // still the outcome that matters.
                if let Err(e) = handle.write_all(input.as_bytes()) {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        return Err(ExecError::Io(e.to_string()));
                    }
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ExecError::Io(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(ExecError::NonZeroExit { stderr })
        }
    }
}
