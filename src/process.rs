use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for spawning a child process.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub log_prefix: String,
}

impl ProcessConfig {
    /// Build a config from a whitespace-separated command line.
    pub fn from_command_line(working_dir: &Path, command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let command = parts
            .next()
            .ok_or_else(|| Error::Process("empty command line".to_string()))?;
        Ok(Self {
            log_prefix: command_line.trim().to_string(),
            command,
            args: parts.collect(),
            working_dir: working_dir.to_path_buf(),
        })
    }
}

/// Output from a completed child process. `lines` holds stdout and stderr
/// interleaved in the order they were read.
#[derive(Debug)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub signal: Option<i32>,
    pub lines: Vec<String>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.signal.is_none()
    }

    /// The combined output as a single newline-terminated string.
    pub fn combined(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

/// Spawn a child process, collect stdout and stderr into one stream, and
/// wait for it to exit. There is no timeout.
pub async fn spawn_and_collect(config: ProcessConfig) -> Result<ProcessOutput> {
    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args)
        .current_dir(&config.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::Process(format!("failed to spawn '{}': {e}", config.command)))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Process("stdout was not piped".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Process("stderr was not piped".into()))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = tokio::spawn(pump(BufReader::new(stdout), tx.clone()));
    let stderr_task = tokio::spawn(pump(BufReader::new(stderr), tx));

    let prefix = config.log_prefix;
    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        debug!("[{prefix}] {line}");
        lines.push(line);
    }

    let status = child
        .wait()
        .await
        .map_err(|e| Error::Process(format!("wait error: {e}")))?;

    for (stream, task) in [("stdout", stdout_task), ("stderr", stderr_task)] {
        task.await
            .map_err(|e| Error::Process(format!("{stream} reader failed: {e}")))?
            .map_err(|e| {
                warn!("[{prefix}] {stream} read error: {e}");
                Error::Process(format!("failed to read {stream} of '{}': {e}", config.command))
            })?;
    }

    let (exit_code, signal) = extract_exit_info(&status);

    Ok(ProcessOutput {
        exit_code,
        signal,
        lines,
    })
}

/// Forward lines from `reader` until end of stream. A read error ends the
/// stream early and is returned, so truncated output never passes as complete.
async fn pump<R: AsyncBufRead + Unpin>(
    mut reader: R,
    tx: mpsc::UnboundedSender<String>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if tx.send(line).is_err() {
            return Ok(());
        }
    }
}

fn extract_exit_info(status: &std::process::ExitStatus) -> (i32, Option<i32>) {
    if let Some(code) = status.code() {
        return (code, None);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return (128 + sig, Some(sig));
        }
    }
    (-1, None)
}

/// Result of running one command line: the combined output plus the reason
/// it failed, if it did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl CommandOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: Some(0),
            error: None,
        }
    }

    pub fn failed(text: impl Into<String>, exit_code: Option<i32>, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs a single command line in a directory. Every repository probe goes
/// through this seam, so tests can substitute canned output.
pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        dir: &Path,
        command_line: &str,
    ) -> impl Future<Output = CommandOutput> + Send;
}

/// Executor backed by real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    async fn execute(&self, dir: &Path, command_line: &str) -> CommandOutput {
        let config = match ProcessConfig::from_command_line(dir, command_line) {
            Ok(c) => c,
            Err(e) => return CommandOutput::failed("", None, e.to_string()),
        };

        match spawn_and_collect(config).await {
            Ok(output) => {
                let text = output.combined();
                if output.success() {
                    CommandOutput::ok(text)
                } else if let Some(sig) = output.signal {
                    CommandOutput::failed(text, None, format!("killed by signal {sig}"))
                } else {
                    CommandOutput::failed(
                        text,
                        Some(output.exit_code),
                        format!("exit status {}", output.exit_code),
                    )
                }
            }
            Err(e) => CommandOutput::failed("", None, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line_splits_on_whitespace() {
        let config =
            ProcessConfig::from_command_line(Path::new("/tmp"), "git  status --porcelain -uall")
                .unwrap();
        assert_eq!(config.command, "git");
        assert_eq!(config.args, vec!["status", "--porcelain", "-uall"]);
        assert_eq!(config.working_dir, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_from_command_line_rejects_blank() {
        let err = ProcessConfig::from_command_line(Path::new("."), "   ").unwrap_err();
        assert!(err.to_string().contains("empty command line"));
    }

    #[test]
    fn test_combined_terminates_each_line() {
        let output = ProcessOutput {
            exit_code: 0,
            signal: None,
            lines: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(output.combined(), "a\nb\n");
    }

    #[test]
    fn test_command_output_success() {
        assert!(CommandOutput::ok("x").success());
        assert!(!CommandOutput::failed("", Some(1), "exit status 1").success());
    }

    struct BrokenReader {
        sent: bool,
    }

    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.sent {
                return std::task::Poll::Ready(Err(std::io::Error::other("pipe broke")));
            }
            self.sent = true;
            buf.put_slice(b"partial\n");
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_pump_returns_read_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = pump(BufReader::new(BrokenReader { sent: false }), tx).await;

        assert!(result.unwrap_err().to_string().contains("pipe broke"));
        assert_eq!(rx.recv().await.as_deref(), Some("partial"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_stops_at_end_of_stream() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        pump(BufReader::new(&b"one\r\ntwo"[..]), tx).await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
        assert!(rx.recv().await.is_none());
    }
}
