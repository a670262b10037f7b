//! External process execution capability.
//!
//! Everything keel does against the outside world goes through one seam: the
//! [`CommandRunner`] trait. The source fetcher and the terraform tool wrapper
//! build an [`ExecSpec`] (program, argument vector, working directory,
//! timeout) and hand it to a runner; the runner reports an [`ExecOutput`]
//! carrying exit code and captured output.
//!
//! A non-zero exit is *not* an error at this layer. Drivers interpret exit
//! codes (terraform's plan protocol encodes "changes present" as exit 2), so
//! the runner only fails for environmental faults: the executable missing,
//! the spawn failing, the timeout elapsing, or the cancellation token firing.
//!
//! [`SystemRunner`] is the production implementation over
//! [`tokio::process::Command`]. The `mock` submodule (available to tests and
//! behind the `test-utils` feature) provides a rule-based fake so the whole
//! validation and driver pipeline runs without git or terraform installed.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::KeelError;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

/// Elapsed time past which a completed command is logged as slow.
const SLOW_COMMAND_THRESHOLD: Duration = Duration::from_secs(30);

/// One external command invocation: program, arguments, working directory
/// and timeout budget.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    /// Executable name or path.
    pub program: String,
    /// Argument vector, exec-style (no shell interpretation).
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub current_dir: Option<PathBuf>,
    /// Budget after which the child is killed.
    pub timeout: Duration,
}

impl ExecSpec {
    /// New spec for `program` with a 60 second default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set the timeout budget.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Operation label used in logs and errors, the first argument by
    /// convention ("clone", "plan", ...).
    #[must_use]
    pub fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_default()
    }

    fn render(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Process exit code; -1 when terminated by a signal.
    pub exit_code: i32,
    /// Captured stdout, lossily decoded as UTF-8.
    pub stdout: String,
    /// Captured stderr, lossily decoded as UTF-8.
    pub stderr: String,
}

impl ExecOutput {
    /// Successful output with the given stdout and an empty stderr.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr concatenated, for diagnostics.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// Capability to execute external commands.
///
/// Implementations must honour the spec's timeout and the cancellation token,
/// and must return `Ok` for any process that ran to completion regardless of
/// its exit code.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion.
    ///
    /// # Errors
    ///
    /// - [`KeelError::ToolNotFound`] when the executable cannot be resolved
    /// - [`KeelError::CommandFailed`] when the process cannot be spawned
    /// - [`KeelError::CommandTimeout`] when the timeout budget elapses
    /// - [`KeelError::Cancelled`] when the token fires first
    async fn run(&self, spec: ExecSpec, cancel: &CancellationToken) -> Result<ExecOutput, KeelError>;
}

/// Production [`CommandRunner`] over [`tokio::process::Command`].
///
/// Children are spawned with piped stdout/stderr and `kill_on_drop`, so a
/// cancelled or timed-out invocation does not leave the tool running.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: ExecSpec, cancel: &CancellationToken) -> Result<ExecOutput, KeelError> {
        let operation = spec.operation();
        debug!(target: "process", "Executing: {}", spec.render());

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).stdin(Stdio::null()).stdout(Stdio::piped())
            .stderr(Stdio::piped()).kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let result = tokio::select! {
            () = cancel.cancelled() => return Err(KeelError::Cancelled),
            result = timeout(spec.timeout, command.output()) => result,
        };

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KeelError::ToolNotFound {
                    tool: spec.program.clone(),
                });
            }
            Ok(Err(e)) => {
                return Err(KeelError::CommandFailed {
                    tool: spec.program.clone(),
                    operation,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    target: "process",
                    "{} timed out after {:?}",
                    spec.render(),
                    spec.timeout
                );
                return Err(KeelError::CommandTimeout {
                    tool: spec.program.clone(),
                    operation,
                    seconds: spec.timeout.as_secs(),
                });
            }
        };

        let elapsed = start.elapsed();
        if elapsed > SLOW_COMMAND_THRESHOLD {
            warn!(
                target: "perf",
                "Slow command: {} took {:.1}s",
                spec.render(),
                elapsed.as_secs_f64()
            );
        }

        let exec = ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if exec.success() {
            debug!(
                target: "process",
                "{} {} completed in {:?}",
                spec.program,
                operation,
                elapsed
            );
        } else {
            debug!(
                target: "process",
                "{} {} exited {} in {:?}: {}",
                spec.program,
                operation,
                exec.exit_code,
                elapsed,
                exec.stderr.trim()
            );
        }
        Ok(exec)
    }
}

/// Check that a tool is resolvable in PATH.
///
/// # Errors
///
/// Returns [`KeelError::ToolNotFound`] when PATH lookup fails.
pub fn ensure_tool(name: &str) -> Result<(), KeelError> {
    which::which(name).map(|_| ()).map_err(|_| KeelError::ToolNotFound {
        tool: name.to_string(),
    })
}

/// Whether a tool is resolvable in PATH.
#[must_use]
pub fn is_tool_installed(name: &str) -> bool {
    which::which(name).is_ok()
}
