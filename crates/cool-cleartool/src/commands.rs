//! Cleartool command execution.
//!
//! [`CommandRunner`] is the synchronous command capability the UCM layer is
//! written against. [`Cleartool`] implements it by spawning the `cleartool`
//! binary, capturing stdout and stderr, and enforcing an optional timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when running cleartool commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The binary could not be found or spawned.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command exited with a non-zero status.
    #[error("`{command}` failed (exit code {code:?}): {stderr}")]
    Failed {
        command: String,
        /// The exit code, or `None` if the process was killed by a signal.
        code: Option<i32>,
        stderr: String,
    },

    /// The command did not finish in time and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    /// Waiting on or reading from the child process failed.
    #[error("i/o error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    /// The captured stderr of a failed command, empty for other errors.
    pub fn stderr(&self) -> &str {
        match self {
            Self::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }

    /// Returns `true` if the command was killed for exceeding its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// A specialized `Result` type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout_lines: Vec<String>,
    pub stderr: String,
    /// The exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Builds a successful output from stdout lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stdout_lines: lines.into_iter().map(Into::into).collect(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stdout joined with newlines.
    pub fn stdout(&self) -> String {
        self.stdout_lines.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

/// Synchronous access to the backing store's command protocol.
///
/// Implementors provide [`CommandRunner::invoke`], which reports any exit
/// status as data. [`CommandRunner::execute`] layers the usual "non-zero
/// exit is an error" policy on top.
pub trait CommandRunner: Send + Sync {
    /// Runs one command and returns its output whatever the exit status.
    ///
    /// Only spawn failures, I/O failures and timeouts are errors here.
    fn invoke(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput>;

    /// Runs one command, failing on a non-zero exit status.
    fn execute(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let output = self.invoke(args, cwd)?;
        if !output.success() {
            return Err(CommandError::Failed {
                command: args.join(" "),
                code: output.exit_code,
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }

    /// Runs one command and accepts any exit status.
    fn execute_tolerant(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        self.invoke(args, cwd)
    }

    /// Runs one command in the current directory and returns its stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        Ok(self.execute(args, None)?.stdout())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn invoke(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        (**self).invoke(args, cwd)
    }

    fn execute(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        (**self).execute(args, cwd)
    }
}

// ---------------------------------------------------------------------------
// Process runner
// ---------------------------------------------------------------------------

/// Default name of the cleartool binary.
pub const DEFAULT_BINARY: &str = "cleartool";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs commands through the `cleartool` binary.
#[derive(Debug, Clone)]
pub struct Cleartool {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl Default for Cleartool {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleartool {
    /// A runner using `cleartool` from `PATH`, without a timeout.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            timeout: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Kills any command running longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary.display(), args.join(" "))
    }
}

impl CommandRunner for Cleartool {
    fn invoke(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let command = self.command_line(args);
        debug!(%command, "running cleartool");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            program: self.binary.display().to_string(),
            source,
        })?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we poll for exit.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let out_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stdout) = stdout {
                let _ = stdout.read_to_end(&mut buf);
            }
            buf
        });
        let err_handle = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf);
            }
            buf
        });

        let io_err = |source| CommandError::Io {
            command: command.clone(),
            source,
        };

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                break status;
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    warn!(%command, ?timeout, "cleartool timed out, killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(CommandError::TimedOut {
                        command: command.clone(),
                        timeout,
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout_buf = out_handle.join().unwrap_or_default();
        let stderr_buf = err_handle.join().unwrap_or_default();

        let output = CommandOutput {
            stdout_lines: String::from_utf8_lossy(&stdout_buf)
                .lines()
                .map(str::to_owned)
                .collect(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            exit_code: status.code(),
        };
        trace!(
            %command,
            exit_code = ?output.exit_code,
            lines = output.stdout_lines.len(),
            "cleartool finished"
        );
        Ok(output)
    }

    fn execute(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let output = self.invoke(args, cwd)?;
        if !output.success() {
            return Err(CommandError::Failed {
                command: self.command_line(args),
                code: output.exit_code,
                stderr: output.stderr.trim().to_owned(),
            });
        }
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
