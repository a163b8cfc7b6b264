//! Run an external binary with bytes on stdin and a hard timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (10 MiB).
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Captured result of a finished process.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub duration_ms: u64,
}

/// Error type for [`run_with_input`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Process I/O error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Process timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

/// Spawn `cmd`, pipe `input` to its stdin, capture stdout/stderr and enforce
/// `timeout`. The child is killed if the timeout fires.
pub async fn run_with_input(
    cmd: &mut Command,
    input: &[u8],
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;

    // Drain output before feeding stdin so a chatty child cannot block on a full pipe.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let stdin = child.stdin.take();
    let payload = input.to_vec();
    let stdin_task = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            // The child may exit before consuming everything; its exit code decides.
            let _ = stdin.write_all(&payload).await;
        }
    });

    let waited = tokio::time::timeout(timeout, child.wait()).await;
    stdin_task.abort();

    match waited {
        Ok(Ok(status)) => {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok(ProcessOutput {
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                exit_code: status.code().unwrap_or(-1),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        Ok(Err(e)) => Err(ProcessError::Io(e)),
        Err(_elapsed) => Err(ProcessError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        }),
    }
}

/// Read an entire output stream, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES as u64).read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn echoes_stdin_through_cat() {
        let mut cmd = Command::new("cat");
        let out = run_with_input(&mut cmd, b"hello", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo oops >&2; exit 3"]);
        let out = run_with_input(&mut cmd, b"", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let mut cmd = Command::new("/nonexistent/imgocr-test-binary");
        let err = run_with_input(&mut cmd, b"", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_matches!(err, ProcessError::Spawn(_));
    }

    #[tokio::test]
    async fn slow_process_times_out() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let err = run_with_input(&mut cmd, b"", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_matches!(err, ProcessError::Timeout { .. });
    }
}
