//! Subprocess invocation for action commands.
//!
//! `ProcessRunner` is the seam between the orchestrator and the operating
//! system; `SystemRunner` is the real implementation. Each call spawns one
//! process, waits for it under a timeout, and returns its stdout. A process
//! that outlives the timeout is killed.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::command::CommandSpec;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// ExecutionFailure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The process ran and exited non-zero (or was killed by a signal).
    NonZeroExit,
    /// The executable was missing or could not be started.
    SpawnFailed,
    /// The process did not exit before the runner's timeout.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl ExecutionFailure {
    pub fn exited(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::NonZeroExit,
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::SpawnFailed,
            exit_code: None,
            stderr: message.into(),
        }
    }

    pub fn timed_out(after: Duration) -> Self {
        Self {
            kind: FailureKind::TimedOut,
            exit_code: None,
            stderr: format!("timed out after {}s", after.as_secs_f64()),
        }
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.exit_code) {
            (FailureKind::NonZeroExit, Some(code)) if self.stderr.is_empty() => {
                write!(f, "process exited with code {code}")
            }
            (FailureKind::NonZeroExit, Some(code)) => {
                write!(f, "process exited with code {code}: {}", self.stderr)
            }
            (FailureKind::NonZeroExit, None) => {
                write!(f, "process terminated by signal: {}", self.stderr)
            }
            _ => f.write_str(&self.stderr),
        }
    }
}

impl std::error::Error for ExecutionFailure {}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion and return its captured stdout.
    async fn run(&self, command: &CommandSpec) -> Result<String, ExecutionFailure>;
}

// ---------------------------------------------------------------------------
// SystemRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
    working_dir: Option<PathBuf>,
    max_output_bytes: usize,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            working_dir: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(test)]
    pub(crate) fn working_dir(&self) -> Option<&std::path::Path> {
        self.working_dir.as_deref()
    }

    fn resolve_program(&self, program: &str) -> Result<PathBuf, ExecutionFailure> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        which::which_in(program, std::env::var_os("PATH"), cwd).map_err(|e| {
            ExecutionFailure::spawn_failed(format!("executable '{program}' not found: {e}"))
        })
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<String, ExecutionFailure> {
        let program = self.resolve_program(&command.program)?;

        let mut cmd = Command::new(&program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            ExecutionFailure::spawn_failed(format!(
                "failed to spawn '{}': {e}",
                command.program
            ))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| ExecutionFailure::spawn_failed(format!("wait failed: {e}")))?,
            Err(_) => {
                tracing::warn!(program = %command.program, timeout = ?self.timeout, "process timed out");
                return Err(ExecutionFailure::timed_out(self.timeout));
            }
        };

        let stdout = truncate(
            String::from_utf8_lossy(&output.stdout).trim_end(),
            self.max_output_bytes,
        );

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = truncate(
            String::from_utf8_lossy(&output.stderr).trim_end(),
            self.max_output_bytes,
        );
        let detail = if stderr.is_empty() { stdout } else { stderr };
        Err(ExecutionFailure::exited(output.status.code(), detail))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… [truncated]", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn spec(program: &str, args: &[&str]) -> CommandSpec {
        CommandSpec {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn captures_stdout_without_trailing_newline() {
        let out = SystemRunner::default()
            .run(&spec("echo", &["pong"]))
            .await
            .unwrap();
        assert_eq!(out, "pong");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_code_and_stderr() {
        let err = SystemRunner::default()
            .run(&spec("sh", &["-c", "echo broken >&2; exit 3"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::NonZeroExit);
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.stderr, "broken");
        assert_eq!(err.to_string(), "process exited with code 3: broken");
    }

    #[tokio::test]
    async fn non_zero_exit_falls_back_to_stdout() {
        let err = SystemRunner::default()
            .run(&spec("sh", &["-c", "echo only-stdout; exit 1"]))
            .await
            .unwrap_err();
        assert_eq!(err.stderr, "only-stdout");
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_failure() {
        let err = SystemRunner::default()
            .run(&spec("__switchboard_missing_binary__", &[]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::SpawnFailed);
        assert!(err.exit_code.is_none());
        assert!(
            err.stderr.contains("__switchboard_missing_binary__"),
            "{}",
            err.stderr
        );
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let runner = SystemRunner::new(Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = runner.run(&spec("sleep", &["5"])).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn env_and_working_dir_reach_the_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut command = spec("sh", &["-c", "echo \"$GREETING\"; pwd"]);
        command.env.insert("GREETING".into(), "hello".into());
        let out = SystemRunner::default()
            .with_working_dir(dir.path())
            .run(&command)
            .await
            .unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("hello"));
        let pwd = std::path::PathBuf::from(lines.next().unwrap());
        assert_eq!(
            pwd.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn long_output_is_truncated() {
        let runner = SystemRunner {
            max_output_bytes: 8,
            ..SystemRunner::default()
        };
        let out = runner
            .run(&spec("echo", &["abcdefghijklmnop"]))
            .await
            .unwrap();
        assert_eq!(out, "abcdefgh… [truncated]");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h… [truncated]");
        assert_eq!(truncate("short", 10), "short");
    }
}
