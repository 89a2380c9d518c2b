//! Subprocess execution with deadline enforcement
//!
//! Every call spawns exactly one child, captures its output, and reaps it
//! before returning, whether it exited, failed, or was killed on timeout.

use std::fmt;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::ExecutionOutcome;

/// Default cap for each captured output stream
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Program plus fixed argument list invoked for every test case
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub program: String,
    pub args: Vec<String>,
}

impl Target {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `java -cp <classpath> <entry>`
    pub fn java(java: &str, classpath: &str, entry: &str) -> Self {
        Self::new(java).arg("-cp").arg(classpath).arg(entry)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs one external process per call and classifies the result
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Limit how many bytes of stdout and stderr are kept per invocation
    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub async fn run_target(
        &self,
        target: &Target,
        stdin: Option<Vec<u8>>,
        deadline: Duration,
    ) -> ExecutionOutcome {
        self.run(&target.program, &target.args, stdin, deadline)
            .await
    }

    /// Run `program` to completion.
    ///
    /// A zero `deadline` waits without bound. Otherwise the wait races a
    /// timer; if the timer fires first the process group is killed, the
    /// child is reaped, and the outcome is [`ExecutionOutcome::TimedOut`].
    pub async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<Vec<u8>>,
        deadline: Duration,
    ) -> ExecutionOutcome {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                debug!("Failed to spawn {}: {}", program, e);
                return ExecutionOutcome::startup_error(format!("failed to start {program}: {e}"));
            }
        };
        // id() is gone once the child has been waited on.
        let pid = child.id();
        let started = Instant::now();
        let expires = (!deadline.is_zero()).then(|| started + deadline);

        let stdin_task = match (child.stdin.take(), stdin) {
            (Some(mut pipe), Some(input)) => Some(tokio::spawn(async move {
                // A child that exits without reading everything closes the pipe on us.
                if let Err(e) = pipe.write_all(&input).await {
                    debug!("stdin write stopped early: {}", e);
                }
            })),
            _ => None,
        };
        let stdout_task = child
            .stdout
            .take()
            .map(|pipe| spawn_capture(pipe, self.max_output_bytes, "stdout"));
        let stderr_task = child
            .stderr
            .take()
            .map(|pipe| spawn_capture(pipe, self.max_output_bytes, "stderr"));

        let waited = if deadline.is_zero() {
            child.wait().await
        } else {
            tokio::select! {
                status = child.wait() => status,
                _ = tokio::time::sleep(deadline) => {
                    terminate(&mut child, pid).await;
                    for task in [stdout_task, stderr_task].into_iter().flatten() {
                        task.abort();
                    }
                    if let Some(task) = stdin_task {
                        task.abort();
                    }
                    debug!(
                        "{} killed after {}ms (deadline {}ms)",
                        program,
                        started.elapsed().as_millis(),
                        deadline.as_millis()
                    );
                    return ExecutionOutcome::TimedOut(deadline);
                }
            }
        };

        // Background helpers left in the group would keep the pipes open.
        kill_group(pid);
        if let Some(task) = stdin_task {
            task.abort();
        }

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to wait for {}: {}", program, e);
                return ExecutionOutcome::runtime_error(format!("failed to wait for {program}: {e}"));
            }
        };

        let stdout = collect(stdout_task, expires).await;
        let stderr = collect(stderr_task, expires).await;
        let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
            debug!(
                "{} exited but its output was still open at the deadline ({}ms)",
                program,
                deadline.as_millis()
            );
            return ExecutionOutcome::TimedOut(deadline);
        };

        debug!(
            "{} exited with {} in {}ms",
            program,
            status,
            started.elapsed().as_millis()
        );

        if status.success() {
            ExecutionOutcome::Success(stdout)
        } else {
            ExecutionOutcome::runtime_error(format!(
                "{}\nstderr: {}",
                status,
                String::from_utf8_lossy(&stderr)
            ))
        }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Kill the child's process group and reap the child.
///
/// Only called while the child has not been waited on yet.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    kill_group(pid);

    if let Err(e) = child.kill().await {
        warn!("Failed to kill timed out process: {}", e);
    }
}

/// SIGKILL every process in the group led by `pid`.
///
/// The child leads its own group (`process_group(0)` at spawn). A group with
/// no members left is not an error.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => debug!("killpg({}) failed: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

fn spawn_capture<R>(
    mut pipe: R,
    limit: usize,
    stream: &'static str,
) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        (&mut pipe).take(limit as u64).read_to_end(&mut buf).await?;

        // Keep draining so the child never blocks on a full pipe.
        let discarded = tokio::io::copy(&mut pipe, &mut tokio::io::sink()).await?;
        if discarded > 0 {
            warn!(
                "{} exceeded {} bytes, discarded {} bytes",
                stream, limit, discarded
            );
        }
        Ok(buf)
    })
}

/// Join a capture task, giving up at `expires`.
///
/// Returns `None` if the stream was still open when `expires` passed.
async fn collect(
    task: Option<JoinHandle<io::Result<Vec<u8>>>>,
    expires: Option<Instant>,
) -> Option<Vec<u8>> {
    let Some(mut task) = task else {
        return Some(Vec::new());
    };

    let joined = match expires {
        Some(expires) => {
            let expires = tokio::time::Instant::from_std(expires);
            match tokio::time::timeout_at(expires, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return None;
                }
            }
        }
        None => task.await,
    };

    let buf = match joined {
        Ok(Ok(buf)) => buf,
        Ok(Err(e)) => {
            warn!("Failed to read process output: {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("Output capture task failed: {}", e);
            Vec::new()
        }
    };
    Some(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::FailureKind;

    fn sh(script: &str) -> Target {
        Target::new("sh").arg("-c").arg(script)
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        // Absent or zombie both count as gone.
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    #[test]
    fn test_target_display() {
        let target = Target::java("java", "bin", "Main");
        assert_eq!(target.to_string(), "java -cp bin Main");
        assert_eq!(target.args, vec!["-cp", "bin", "Main"]);
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run_target(&sh("cat"), Some(b"hello\n".to_vec()), Duration::from_secs(5))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success(b"hello\n".to_vec()));
    }

    #[tokio::test]
    async fn test_absent_stdin_is_empty() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run_target(&sh("cat; echo done"), None, Duration::ZERO)
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success(b"done\n".to_vec()));
    }

    #[tokio::test]
    async fn test_runtime_error_keeps_stderr() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run_target(&sh("echo boom >&2; exit 1"), None, Duration::from_secs(5))
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Runtime));
        let rendered = outcome.to_string();
        assert!(rendered.contains("boom"), "got: {rendered}");
        assert!(rendered.contains("exit status"), "got: {rendered}");
    }

    #[tokio::test]
    async fn test_missing_program_is_startup_error() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run("definitely-not-a-real-binary-4242", &[], None, Duration::from_secs(1))
            .await;

        assert_eq!(outcome.failure_kind(), Some(FailureKind::Startup));
        assert!(outcome
            .to_string()
            .contains("failed to start definitely-not-a-real-binary-4242"));
    }

    #[tokio::test]
    async fn test_timeout_kills_within_deadline() {
        let runner = ProcessRunner::new();
        let deadline = Duration::from_millis(300);
        let start = Instant::now();

        let outcome = runner
            .run("sleep", &["10".to_string()], None, deadline)
            .await;

        assert_eq!(outcome, ExecutionOutcome::TimedOut(deadline));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_fast_exit_does_not_wait_for_deadline() {
        let runner = ProcessRunner::new();
        let start = Instant::now();

        let outcome = runner
            .run_target(&sh("echo 42"), None, Duration::from_secs(30))
            .await;

        assert!(outcome.is_success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_leaves_no_process_behind() {
        let dir = tempfile::tempdir().unwrap();
        let pids = dir.path().join("pids");
        let script = format!(
            "echo $$ > {0}; sleep 30 & echo $! >> {0}; wait",
            pids.display()
        );

        let runner = ProcessRunner::new();
        let outcome = runner
            .run_target(&sh(&script), None, Duration::from_millis(500))
            .await;
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Timeout));

        let recorded = std::fs::read_to_string(&pids).unwrap();
        let pids: Vec<u32> = recorded
            .lines()
            .map(|l| l.trim().parse().unwrap())
            .collect();
        assert_eq!(pids.len(), 2);

        // The orphaned sleep is reaped by init asynchronously.
        let gone = async {
            while pids.iter().any(|&pid| is_running(pid)) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), gone)
            .await
            .expect("process survived the deadline kill");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_background_helper_does_not_outlive_exit() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper");
        let script = format!("sleep 30 & echo $! > {}; echo hi", pid_file.display());

        let runner = ProcessRunner::new();
        let start = Instant::now();
        let outcome = runner
            .run_target(&sh(&script), None, Duration::from_secs(1))
            .await;

        assert_eq!(outcome, ExecutionOutcome::Success(b"hi\n".to_vec()));
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "helper held the output open for {:?}",
            start.elapsed()
        );

        let helper: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let gone = async {
            while is_running(helper) {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(2), gone)
            .await
            .expect("background helper survived its parent");
    }

    #[tokio::test]
    async fn test_collect_gives_up_on_open_stream() {
        let (reader, _writer) = tokio::io::duplex(64);
        let task = spawn_capture(reader, 1024, "stdout");

        let expires = Instant::now() + Duration::from_millis(100);
        assert_eq!(collect(Some(task), Some(expires)).await, None);
    }

    #[tokio::test]
    async fn test_collect_without_deadline_waits_for_eof() {
        let (reader, mut writer) = tokio::io::duplex(64);
        let task = spawn_capture(reader, 1024, "stdout");

        writer.write_all(b"partial").await.unwrap();
        drop(writer);
        assert_eq!(collect(Some(task), None).await, Some(b"partial".to_vec()));
    }

    #[tokio::test]
    async fn test_output_is_capped() {
        let runner = ProcessRunner::new().with_max_output(1000);
        let outcome = runner
            .run_target(&sh("yes | head -c 100000"), None, Duration::from_secs(10))
            .await;

        match outcome {
            ExecutionOutcome::Success(out) => assert_eq!(out.len(), 1000),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_large_stdin_roundtrip() {
        let input = vec![b'x'; 1 << 20];
        let runner = ProcessRunner::new();
        let outcome = runner
            .run_target(&sh("cat"), Some(input.clone()), Duration::from_secs(10))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success(input));
    }
}
