use crate::config::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Label separating stdout from stderr in a combined output.
pub const STDERR_LABEL: &str = "[stderr]";

/// Output returned when the deadline passes.
pub const TIMEOUT_SENTINEL: &str = "[timeout] Script execution exceeded the configured timeout.";

/// Prefix of every launch-failure output.
pub const LAUNCH_FAILURE_MARKER: &str = "[launch-failure]";

const UNIT_PREFIX: &str = "parley-exec-";
const UNIT_STEM: &str = "script";

/// Environment variables passed through to the child. Everything else is cleared.
const PRESERVED_ENV: [&str; 4] = ["PATH", "HOME", "LANG", "SYSTEMROOT"];

/// How long the pipes may stay open after the interpreter exits.
const PIPE_GRACE: Duration = Duration::from_millis(250);

/// Outcome classification of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Exited with status 0.
    #[serde(rename = "ok")]
    Ok,
    /// Exited with a non-zero status or was killed by a signal.
    #[serde(rename = "nonzero-exit")]
    NonZeroExit,
    /// Still running at the deadline and killed.
    #[serde(rename = "timeout")]
    Timeout,
    /// The interpreter could not be started.
    #[serde(rename = "launch-failure")]
    LaunchFailure,
}

impl ExecutionStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Ok => "ok",
            ExecutionStatus::NonZeroExit => "nonzero-exit",
            ExecutionStatus::Timeout => "timeout",
            ExecutionStatus::LaunchFailure => "launch-failure",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Sandbox::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome classification.
    pub status: ExecutionStatus,
    /// Caller-facing text, composed from the streams or a sentinel.
    pub output: String,
    /// Captured stdout, possibly truncated.
    pub stdout: String,
    /// Captured stderr, possibly truncated.
    pub stderr: String,
    /// `None` when the process was killed by a signal or never ran.
    pub exit_code: Option<i32>,
    /// Wall-clock time from materialization to classification.
    pub duration_ms: u64,
    /// Temporary directory the script ran in. Already removed when returned.
    pub unit_path: PathBuf,
}

impl ExecutionResult {
    /// Whether the script exited with status 0.
    pub fn is_ok(&self) -> bool {
        self.status == ExecutionStatus::Ok
    }

    fn without_process(
        status: ExecutionStatus,
        output: String,
        unit_path: PathBuf,
        started: Instant,
    ) -> Self {
        Self {
            status,
            output,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            duration_ms: started.elapsed().as_millis() as u64,
            unit_path,
        }
    }
}

/// Runs untrusted scripts in throwaway directories under a child interpreter.
///
/// Every call gets its own [`TempDir`], removed before `run` returns whatever
/// the outcome. The interpreter leads its own process group, which is killed
/// once the run is classified.
/// Runs are plain async tasks: a hanging script only occupies its own task.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    /// Creates a sandbox with `config`.
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Runs `source` with the configured default deadline.
    pub async fn run_default(&self, source: &str) -> ExecutionResult {
        self.run(source, Duration::from_secs(self.config.default_timeout_secs))
            .await
    }

    /// Runs `source` and waits at most `timeout` for it to finish.
    ///
    /// A zero timeout launches the child and kills it straight away.
    pub async fn run(&self, source: &str, timeout: Duration) -> ExecutionResult {
        let started = Instant::now();

        let (unit, script_path) = match self.materialize(source).await {
            Ok(materialized) => materialized,
            Err(e) => {
                warn!(error = %e, "Failed to materialize script");
                return ExecutionResult::without_process(
                    ExecutionStatus::LaunchFailure,
                    format!("{LAUNCH_FAILURE_MARKER} could not prepare script: {e}"),
                    PathBuf::new(),
                    started,
                );
            }
        };
        let unit_path = unit.path().to_path_buf();

        info!(
            interpreter = %self.config.interpreter,
            unit = %unit_path.display(),
            timeout_ms = timeout.as_millis() as u64,
            "Executing script"
        );

        let child = match self.spawn(&script_path, unit.path()) {
            Ok(child) => child,
            Err(e) => {
                remove_unit(unit).await;
                let output = if e.kind() == std::io::ErrorKind::NotFound {
                    format!(
                        "{LAUNCH_FAILURE_MARKER} interpreter '{}' not found",
                        self.config.interpreter
                    )
                } else {
                    format!(
                        "{LAUNCH_FAILURE_MARKER} failed to start '{}': {e}",
                        self.config.interpreter
                    )
                };
                warn!(interpreter = %self.config.interpreter, error = %e, "Launch failed");
                return ExecutionResult::without_process(
                    ExecutionStatus::LaunchFailure,
                    output,
                    unit_path,
                    started,
                );
            }
        };

        let result = self.supervise(child, timeout, unit_path, started).await;
        remove_unit(unit).await;

        info!(
            status = %result.status,
            exit_code = ?result.exit_code,
            elapsed_ms = result.duration_ms,
            "Script finished"
        );
        result
    }

    async fn materialize(&self, source: &str) -> std::io::Result<(TempDir, PathBuf)> {
        let unit = tempfile::Builder::new().prefix(UNIT_PREFIX).tempdir()?;
        let script_path = unit
            .path()
            .join(format!("{UNIT_STEM}{}", self.config.file_extension));
        tokio::fs::write(&script_path, source).await?;
        debug!(path = %script_path.display(), bytes = source.len(), "Script written");
        Ok((unit, script_path))
    }

    fn spawn(&self, script_path: &Path, workdir: &Path) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.args(&self.config.interpreter_args)
            .arg(script_path)
            .current_dir(workdir)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        for key in PRESERVED_ENV {
            if let Some(value) = std::env::var_os(key) {
                cmd.env(key, value);
            }
        }
        cmd.spawn()
    }

    /// Waits for the interpreter to exit or the deadline to pass.
    ///
    /// The outcome depends on the interpreter alone. Background processes it
    /// left behind may keep the pipes open; they get [`PIPE_GRACE`] to finish
    /// writing before the whole process group is killed.
    async fn supervise(
        &self,
        mut child: Child,
        timeout: Duration,
        unit_path: PathBuf,
        started: Instant,
    ) -> ExecutionResult {
        let cap = self.config.max_output_bytes;
        let group = ProcessGroup::of(&child);
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let mut stdout = Captured::default();
        let mut stderr = Captured::default();

        let exited = {
            let drain = async {
                tokio::join!(
                    read_capped(stdout_pipe, cap, &mut stdout),
                    read_capped(stderr_pipe, cap, &mut stderr)
                )
            };
            tokio::pin!(drain);
            let mut drained = false;

            let exited = if timeout.is_zero() {
                None
            } else {
                let deadline = tokio::time::sleep(timeout);
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut drain, if !drained => drained = true,
                        waited = child.wait() => break Some(waited),
                        () = &mut deadline => break None,
                    }
                }
            };

            if !drained
                && matches!(exited, Some(Ok(_)))
                && tokio::time::timeout(PIPE_GRACE, &mut drain).await.is_err()
            {
                debug!("Pipes still open after exit, background processes remain");
            }
            exited
        };

        group.kill();

        let status = match exited {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                return ExecutionResult::without_process(
                    ExecutionStatus::LaunchFailure,
                    format!("{LAUNCH_FAILURE_MARKER} failed to wait for child: {e}"),
                    unit_path,
                    started,
                );
            }
            None => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "Child already gone after group kill");
                }
                warn!(unit = %unit_path.display(), "Script execution timed out");
                return ExecutionResult::without_process(
                    ExecutionStatus::Timeout,
                    TIMEOUT_SENTINEL.to_string(),
                    unit_path,
                    started,
                );
            }
        };

        classify(status, stdout.render(), stderr.render(), unit_path, started)
    }
}

/// Removes an execution unit off the async worker threads.
async fn remove_unit(unit: TempDir) {
    let path = unit.path().to_path_buf();
    match tokio::task::spawn_blocking(move || unit.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(unit = %path.display(), error = %e, "Failed to remove execution unit"),
        Err(e) => warn!(unit = %path.display(), error = %e, "Unit cleanup task failed"),
    }
}

/// The process group led by the interpreter.
///
/// The child is spawned as a group leader, so everything the script starts
/// joins the group unless it explicitly leaves it.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self(child.id())
    }

    #[cfg(unix)]
    fn kill(&self) {
        let Some(pgid) = self.0.and_then(|id| libc::pid_t::try_from(id).ok()) else {
            return;
        };
        if pgid <= 0 {
            return;
        }
        // SAFETY: kill(2) takes two integers and touches no memory of ours.
        let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                warn!(pgid, error = %err, "Failed to kill process group");
            }
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

fn classify(
    status: ExitStatus,
    stdout: String,
    stderr: String,
    unit_path: PathBuf,
    started: Instant,
) -> ExecutionResult {
    let success = status.success();
    ExecutionResult {
        status: if success {
            ExecutionStatus::Ok
        } else {
            ExecutionStatus::NonZeroExit
        },
        output: compose_output(success, &stdout, &stderr),
        stdout,
        stderr,
        exit_code: status.code(),
        duration_ms: started.elapsed().as_millis() as u64,
        unit_path,
    }
}

/// Builds the caller-facing text from the two streams.
///
/// A failed run with no stdout reports stderr alone. Otherwise stdout leads
/// and non-empty stderr follows under [`STDERR_LABEL`].
fn compose_output(success: bool, stdout: &str, stderr: &str) -> String {
    let out = stdout.trim();
    let err = stderr.trim();

    if !success && out.is_empty() {
        return err.to_string();
    }
    match (out.is_empty(), err.is_empty()) {
        (_, true) => out.to_string(),
        (true, false) => err.to_string(),
        (false, false) => format!("{out}\n{STDERR_LABEL}\n{err}"),
    }
}

#[derive(Default)]
struct Captured {
    bytes: Vec<u8>,
    total: usize,
}

impl Captured {
    fn render(&self) -> String {
        let text = String::from_utf8_lossy(&self.bytes);
        if self.total > self.bytes.len() {
            format!("{text}... [truncated, {} total bytes]", self.total)
        } else {
            text.into_owned()
        }
    }
}

/// Reads a pipe to EOF, keeping at most `cap` bytes but counting all of them.
///
/// Writes into `captured` as it goes, so whatever was read survives if the
/// read is abandoned before EOF.
async fn read_capped<R: AsyncRead + Unpin>(pipe: Option<R>, cap: usize, captured: &mut Captured) {
    let Some(mut pipe) = pipe else {
        return;
    };

    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                captured.total += n;
                let room = cap.saturating_sub(captured.bytes.len());
                captured.bytes.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(e) => {
                debug!(error = %e, "Pipe read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_success_stdout_only() {
        assert_eq!(compose_output(true, "  ok\n", ""), "ok");
    }

    #[test]
    fn test_compose_success_with_warnings() {
        assert_eq!(
            compose_output(true, "ok\n", "DeprecationWarning\n"),
            "ok\n[stderr]\nDeprecationWarning"
        );
    }

    #[test]
    fn test_compose_success_stderr_only() {
        assert_eq!(compose_output(true, "", "note\n"), "note");
    }

    #[test]
    fn test_compose_failure_without_stdout_returns_stderr() {
        assert_eq!(
            compose_output(false, "\n", "Traceback\nValueError: boom\n"),
            "Traceback\nValueError: boom"
        );
        assert_eq!(compose_output(false, "", ""), "");
    }

    #[test]
    fn test_compose_failure_with_stdout_labels_stderr() {
        assert_eq!(
            compose_output(false, "partial\n", "boom"),
            "partial\n[stderr]\nboom"
        );
    }

    #[tokio::test]
    async fn test_read_capped_truncates_and_counts() {
        let data: &[u8] = b"abcdefghij";
        let mut captured = Captured::default();
        read_capped(Some(data), 4, &mut captured).await;
        assert_eq!(captured.bytes, b"abcd");
        assert_eq!(captured.total, 10);
        assert_eq!(captured.render(), "abcd... [truncated, 10 total bytes]");
    }

    #[tokio::test]
    async fn test_read_capped_missing_pipe() {
        let mut captured = Captured::default();
        read_capped::<&[u8]>(None, 4, &mut captured).await;
        assert_eq!(captured.render(), "");
    }

    #[test]
    fn test_status_serializes_as_classification() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::NonZeroExit).unwrap(),
            "\"nonzero-exit\""
        );
        assert_eq!(ExecutionStatus::LaunchFailure.to_string(), "launch-failure");
    }
}
