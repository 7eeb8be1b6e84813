//! Command execution abstraction for testability.
//!
//! This module provides a trait-based abstraction over process spawning,
//! allowing unit tests to mock ipset invocations without a kernel. The real
//! implementation enforces the [`RunLimits`] of each call: the child is killed
//! and reaped when the timeout expires or the cancel token fires.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{IpsetError, Result};

#[cfg(test)]
use mockall::automock;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// The exit code, if available
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Successful output carrying `stdout`. Handy for mocks.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// Failed output with exit code 1 carrying `stderr`. Handy for mocks.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(1),
        }
    }
}

/// Bounds applied to a single subprocess run.
#[derive(Debug, Clone, Default)]
pub struct RunLimits {
    /// Kill the child once this much time has elapsed. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Kill the child as soon as this token is cancelled.
    pub cancel: Option<CancelToken>,
}

impl RunLimits {
    fn is_unbounded(&self) -> bool {
        self.timeout.is_none() && self.cancel.is_none()
    }
}

/// Trait for command execution, allowing dependency injection for testing.
///
/// The real implementation spawns processes; tests use the generated
/// `MockCommandExecutor` to assert argv and script the results.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Execute `program` with `args`, capturing stdout and stderr.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not as
    /// an error. Errors are reserved for spawn failures, timeouts and
    /// cancellation.
    fn execute(
        &self,
        program: &Path,
        args: &[String],
        limits: &RunLimits,
    ) -> Result<CommandOutput>;

    /// Execute a command with `stdin` written to its standard input.
    fn execute_with_stdin(
        &self,
        program: &Path,
        args: &[String],
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<CommandOutput>;
}

/// Real implementation of CommandExecutor that runs actual system commands.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    /// Create a new RealCommandExecutor
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin_data: Option<&str>,
        limits: &RunLimits,
    ) -> Result<CommandOutput> {
        let spawn_err = |source| IpsetError::Spawn {
            program: program.to_path_buf(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // stdin is written from its own thread so a child that fills its
        // stdout pipe before draining stdin cannot deadlock us.
        let writer = match (stdin_data, child.stdin.take()) {
            (Some(data), Some(mut stdin)) => {
                let data = data.to_owned();
                Some(thread::spawn(move || stdin.write_all(data.as_bytes())))
            }
            _ => None,
        };
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let command = args.first().cloned().unwrap_or_default();
        let status = wait_bounded(&mut child, &command, limits).map_err(|err| match err {
            WaitError::Io(source) => spawn_err(source),
            WaitError::Limit(err) => err,
        })?;

        if let Some(Err(e)) = writer.and_then(join_quietly) {
            // The child may exit without reading all of stdin; its exit
            // status is what matters.
            debug!("writing stdin to {} failed: {}", program.display(), e);
        }

        Ok(CommandOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
            success: status.success(),
            code: status.code(),
        })
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(
        &self,
        program: &Path,
        args: &[String],
        limits: &RunLimits,
    ) -> Result<CommandOutput> {
        self.run(program, args, None, limits)
    }

    fn execute_with_stdin(
        &self,
        program: &Path,
        args: &[String],
        stdin: &str,
        limits: &RunLimits,
    ) -> Result<CommandOutput> {
        self.run(program, args, Some(stdin), limits)
    }
}

enum WaitError {
    Io(std::io::Error),
    Limit(IpsetError),
}

/// Wait for `child`, killing it if the limits are exceeded.
fn wait_bounded(
    child: &mut Child,
    command: &str,
    limits: &RunLimits,
) -> std::result::Result<ExitStatus, WaitError> {
    if limits.is_unbounded() {
        return child.wait().map_err(WaitError::Io);
    }

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(WaitError::Io)? {
            return Ok(status);
        }

        if limits.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            kill_and_reap(child);
            return Err(WaitError::Limit(IpsetError::Cancelled {
                command: command.to_string(),
            }));
        }

        if let Some(timeout) = limits.timeout {
            if started.elapsed() >= timeout {
                kill_and_reap(child);
                return Err(WaitError::Limit(IpsetError::Timeout {
                    command: command.to_string(),
                    after: timeout,
                }));
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("failed to kill child process {}: {}", child.id(), e);
    }
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_quietly<T>(handle: JoinHandle<T>) -> Option<T> {
    handle.join().ok()
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(join_quietly)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Helper function to convert a slice of &str to Vec<String>.
///
/// This is needed because mockall has issues with lifetimes in `&[&str]`,
/// so we use `&[String]` in the trait signature instead.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
