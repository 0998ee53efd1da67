//! Local process execution using `tokio::process`

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument, warn};

use crate::error::ExecError;
use crate::result::{Invocation, ProcessResult};
use crate::traits::{ChunkStream, Executor};

/// How long stderr forwarding may trail the child's exit
///
/// A background grandchild can hold the inherited stderr pipe open after the
/// child exits; forwarding is abandoned once this elapses.
const FORWARD_GRACE: Duration = Duration::from_millis(250);

/// Local process executor
///
/// Spawns programs on the local machine with `tokio::process::Command`,
/// passing the argument vector directly to the OS.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Base command for `invocation` with stdin closed
    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(invocation.os_args()).stdin(Stdio::null());

        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        cmd
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy `reader` to `writer` chunk by chunk, flushing after each one
///
/// Returns the number of bytes forwarded.
pub(crate) async fn forward<R, W>(reader: R, mut writer: W) -> Result<u64, ExecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut chunks = ReaderStream::new(reader);
    let mut forwarded = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        writer.flush().await?;
        forwarded += chunk.len() as u64;
    }

    Ok(forwarded)
}

impl LocalExecutor {
    /// Run `invocation` to exit, copying its stderr to `writer`
    ///
    /// Completes when the child exits. Forwarding gets [`FORWARD_GRACE`] to
    /// drain what is left in the pipe and is then aborted.
    pub(crate) async fn run_forwarding<W>(
        invocation: &Invocation,
        writer: W,
    ) -> Result<ProcessResult, ExecError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let start = Instant::now();

        debug!(command = %invocation, "executing local command");

        let mut child = Self::command(invocation)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::from_spawn(&invocation.program, &e))?;

        let stderr = child
            .stderr
            .take()
            .ok_or(ExecError::MissingPipe("stderr"))?;

        let mut forwarder = tokio::spawn(forward(stderr, writer));

        let exit = match child.wait().await {
            Ok(exit) => exit,
            Err(e) => {
                forwarder.abort();
                return Err(e.into());
            }
        };
        let duration = start.elapsed();

        match tokio::time::timeout(FORWARD_GRACE, &mut forwarder).await {
            Ok(Ok(Ok(bytes))) => debug!(bytes, "stderr forwarded"),
            Ok(Ok(Err(e))) => warn!(error = %e, "stderr passthrough interrupted"),
            Ok(Err(e)) => warn!(error = %e, "stderr forwarder task failed"),
            Err(_) => {
                forwarder.abort();
                debug!("stderr still open after exit, stopped forwarding");
            }
        }

        let status = exit.code().unwrap_or(-1);

        debug!(
            command = %invocation,
            status = status,
            duration = ?duration,
            "command completed"
        );

        Ok(ProcessResult { status, duration })
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    #[instrument(skip(self), level = "debug")]
    async fn capture_stdout(&self, invocation: &Invocation) -> Result<ChunkStream, ExecError> {
        debug!(command = %invocation, "capturing stdout");

        let mut child = Self::command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExecError::from_spawn(&invocation.program, &e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or(ExecError::MissingPipe("stdout"))?;

        // Reap the child once it exits; the caller only sees the stream
        let program = invocation.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(program = %program, status = ?status.code(), "capture exited"),
                Err(e) => warn!(program = %program, error = %e, "failed to reap child"),
            }
        });

        let stream = ReaderStream::new(stdout)
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ExecError::from));

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), level = "debug")]
    async fn run_passthrough(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        Self::run_forwarding(invocation, tokio::io::stderr()).await
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::reduce::concat;

    async fn capture(executor: &LocalExecutor, invocation: &Invocation) -> String {
        let stream = executor.capture_stdout(invocation).await.unwrap();
        let bytes = concat().reduce(stream).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_capture_stdout() {
        let executor = LocalExecutor::new();
        let output = capture(&executor, &Invocation::new("echo").arg("hello")).await;

        assert_eq!(output, "hello\n");
    }

    #[tokio::test]
    async fn test_arguments_are_not_shell_interpreted() {
        let executor = LocalExecutor::new();
        let inv = Invocation::new("echo").args(["a;", "$(whoami)", "|", "b"]);
        let output = capture(&executor, &inv).await;

        assert_eq!(output.trim(), "a; $(whoami) | b");
    }

    #[tokio::test]
    async fn test_capture_honors_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let executor = LocalExecutor::new();
        let inv = Invocation::new("pwd").with_working_dir(dir.path());
        let output = capture(&executor, &inv).await;

        let expected = dir.path().canonicalize().unwrap();
        let actual = std::path::PathBuf::from(output.trim()).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_run_passthrough_success() {
        let executor = LocalExecutor::new();
        let result = executor
            .run_passthrough(&Invocation::new("true"))
            .await
            .unwrap();

        assert!(result.success());
    }

    #[tokio::test]
    async fn test_run_passthrough_reports_exit_status() {
        let executor = LocalExecutor::new();
        let inv = Invocation::new("sh").args(["-c", "echo oops >&2; exit 42"]);
        let result = executor.run_passthrough(&inv).await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = LocalExecutor::new();
        let inv = Invocation::new("npmkit-definitely-not-installed");

        let err = executor.run_passthrough(&inv).await.unwrap_err();
        assert!(err.is_not_found());

        let err = executor.capture_stdout(&inv).await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_run_forwarding_copies_stderr() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        let inv = Invocation::new("sh").args([
            "-c",
            "echo out; echo npm WARN one >&2; echo npm WARN two >&2",
        ]);

        let result = LocalExecutor::run_forwarding(&inv, writer).await.unwrap();
        assert!(result.success());

        let mut forwarded = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut forwarded)
            .await
            .unwrap();
        assert_eq!(forwarded, "npm WARN one\nnpm WARN two\n");
    }

    #[tokio::test]
    async fn test_run_passthrough_completes_on_exit() {
        // The background sleep inherits stderr and keeps the pipe open
        let executor = LocalExecutor::new();
        let inv = Invocation::new("sh").args(["-c", "sleep 5 & exit 0"]);

        let start = Instant::now();
        let result = executor.run_passthrough(&inv).await.unwrap();

        assert!(result.success());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_forward_copies_every_chunk() {
        let mut sink = Vec::new();
        let forwarded = forward(&b"npm WARN deprecated\nnpm ERR! oops\n"[..], &mut sink)
            .await
            .unwrap();

        assert_eq!(forwarded, 34);
        assert_eq!(sink, b"npm WARN deprecated\nnpm ERR! oops\n");
    }
}
