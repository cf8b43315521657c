//! Bounded external command execution with live output streaming.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::SpawnError;
use crate::request::{StreamCallback, StreamKind};

/// Captured result of one external command execution.
///
/// A non-zero exit (or a timeout) is reported here as `success = false`,
/// never as an error; errors are reserved for processes that could not be
/// launched at all.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Whether the command exited with status zero within the time limit.
    pub success: bool,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// Executes one external command with a bounded lifetime.
///
/// Output is delivered twice: every line is forwarded to the optional
/// stream callback as it arrives (live progress), and the full text is
/// accumulated for classification and storage.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        CommandRunner { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `command` (argv form, first element is the executable) in `cwd`.
    ///
    /// On timeout the child is killed and the result is unsuccessful, with
    /// a marker line pushed to the stream and recorded in stderr.
    pub async fn run(
        &self,
        command: &[String],
        cwd: &Path,
        stream: Option<&StreamCallback>,
    ) -> Result<ProcessOutput, SpawnError> {
        let (exe, args) = match command.split_first() {
            Some(parts) => parts,
            None => {
                return Err(SpawnError {
                    command: String::new(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
                })
            }
        };

        debug!(command = %command.join(" "), cwd = %cwd.display(), "spawning");

        let mut child = Command::new(exe)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SpawnError {
                command: command.join(" "),
                source,
            })?;

        // Both pipes are drained concurrently so neither can fill up and
        // block the child.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let bounded = async {
            let (captured_out, captured_err) = tokio::join!(
                drain(stdout, StreamKind::Out, stream),
                drain(stderr, StreamKind::Err, stream),
            );
            let status = child.wait().await;
            (status, captured_out, captured_err)
        };

        let waited = tokio::time::timeout(self.timeout, bounded).await;
        match waited {
            Ok((status, stdout, stderr)) => {
                let success = status.map(|s| s.success()).unwrap_or(false);
                Ok(ProcessOutput {
                    success,
                    stdout,
                    stderr,
                })
            }
            Err(_) => {
                let _ = child.kill().await;
                let marker = format!("command timed out after {}s", self.timeout.as_secs());
                if let Some(cb) = stream {
                    cb(StreamKind::Err, &marker);
                }
                Ok(ProcessOutput {
                    success: false,
                    stdout: String::new(),
                    stderr: marker,
                })
            }
        }
    }
}

/// Forward lines to the callback while accumulating the full text.
async fn drain<R: AsyncRead + Unpin>(
    reader: Option<R>,
    kind: StreamKind,
    stream: Option<&StreamCallback>,
) -> String {
    let mut captured = String::new();
    let Some(reader) = reader else {
        return captured;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(cb) = stream {
            cb(kind, &line);
        }
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let runner = CommandRunner::new(Duration::from_secs(60));
        let output = runner
            .run(&argv(&["echo", "hello"]), Path::new("."), None)
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.stdout, "hello\n");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let runner = CommandRunner::new(Duration::from_secs(60));
        let output = runner
            .run(&argv(&["false"]), Path::new("."), None)
            .await
            .unwrap();

        assert!(!output.success);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runner = CommandRunner::new(Duration::from_secs(60));
        let result = runner
            .run(
                &argv(&["/nonexistent-binary-that-does-not-exist"]),
                Path::new("."),
                None,
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_command_is_spawn_error() {
        let runner = CommandRunner::new(Duration::from_secs(60));
        assert!(runner.run(&[], Path::new("."), None).await.is_err());
    }

    #[tokio::test]
    async fn test_stream_receives_tagged_lines() {
        let lines: Arc<Mutex<Vec<(StreamKind, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let cb = move |kind: StreamKind, line: &str| {
            sink.lock().unwrap().push((kind, line.to_string()));
        };

        let runner = CommandRunner::new(Duration::from_secs(60));
        let output = runner
            .run(
                &argv(&["sh", "-c", "echo out-line; echo err-line >&2"]),
                Path::new("."),
                Some(&cb),
            )
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.stdout, "out-line\n");
        assert_eq!(output.stderr, "err-line\n");

        let seen = lines.lock().unwrap();
        assert!(seen.contains(&(StreamKind::Out, "out-line".to_string())));
        assert!(seen.contains(&(StreamKind::Err, "err-line".to_string())));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_reports_failure() {
        let runner = CommandRunner::new(Duration::from_secs(1));
        let output = runner
            .run(&argv(&["sleep", "30"]), Path::new("."), None)
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.stderr.contains("timed out"));
    }
}
