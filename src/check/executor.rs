//! External process execution with a hard timeout.
//! Non-zero exit is a normal outcome; only failure to run at all is an error.

use std::io::{ErrorKind, Read};
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

use crate::utils::masked_argv;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ── 数据结构 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub argv: Vec<String>,
    pub timeout: Duration,
}

impl ExternalCommand {
    pub fn new<I, S>(argv: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// -1 when the process was killed by a signal
    pub exit_code: i32,
    pub signal: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stderr if it has anything to say, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim()
        } else {
            err
        }
    }

    /// One-line description of an unsuccessful run.
    pub fn failure(&self) -> String {
        match self.signal {
            Some(sig) => format!("killed by signal {} ({})", sig, signal_name(sig)),
            None => format!("exit {}: {}", self.exit_code, self.diagnostic()),
        }
    }
}

fn signal_name(sig: i32) -> &'static str {
    match sig {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        9 => "SIGKILL",
        13 => "SIGPIPE",
        15 => "SIGTERM",
        _ => "unknown",
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("timeout after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    #[error("`{program}` not found")]
    NotFound { program: String },

    #[error("permission denied running `{program}`")]
    PermissionDenied { program: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command")]
    EmptyCommand,
}

pub trait Executor {
    fn execute(&self, cmd: &ExternalCommand) -> Result<CommandOutput, ExecutionError>;
}

// ── 系统实现 ────────────────────────────────────────────────────────────────

/// Spawns real processes. Stateless; one child per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, cmd: &ExternalCommand) -> Result<CommandOutput, ExecutionError> {
        let (program, args) = cmd.argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
        debug!(cmd = %masked_argv(&cmd.argv), timeout_s = cmd.timeout.as_secs(), "exec");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        // Drain pipes on their own threads so a chatty child can't block on a full pipe
        let stdout_rx = child.stdout.take().map(spawn_reader);
        let stderr_rx = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + cmd.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        debug!(program = cmd.program(), "killed after timeout");
                        return Err(ExecutionError::Timeout { timeout: cmd.timeout });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(spawn_error(program, e)),
            }
        };

        // A backgrounded grandchild can keep the pipes open after the child exits
        let (Some(stdout), Some(stderr)) = (
            collect_pipe(stdout_rx, deadline),
            collect_pipe(stderr_rx, deadline),
        ) else {
            debug!(program = cmd.program(), "output still open at deadline");
            return Err(ExecutionError::Timeout { timeout: cmd.timeout });
        };

        let output = CommandOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
            signal: status.signal(),
        };
        trace!(exit_code = output.exit_code, stdout = %output.stdout.trim(), "exec done");
        Ok(output)
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> ExecutionError {
    match e.kind() {
        ErrorKind::NotFound => ExecutionError::NotFound { program: program.to_string() },
        ErrorKind::PermissionDenied => {
            ExecutionError::PermissionDenied { program: program.to_string() }
        }
        _ => ExecutionError::Spawn { program: program.to_string(), source: e },
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Pipe contents, or `None` if the pipe is still open at `deadline`.
fn collect_pipe(rx: Option<mpsc::Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(rx) = rx else {
        return Some(String::new());
    };
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
        Err(mpsc::RecvTimeoutError::Timeout) => None,
        Err(mpsc::RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}
