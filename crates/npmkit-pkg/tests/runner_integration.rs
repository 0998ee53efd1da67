use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;

use npmkit_exec::{ChunkStream, ExecError, Executor, Invocation, ProcessResult};
use npmkit_pkg::*;

// Mock implementations
struct MockExecutor {
    version_chunks: Vec<Result<Vec<u8>, ExecError>>,
    capture_error: Option<ExecError>,
    exit_status: i32,
    captures: AtomicUsize,
    runs: AtomicUsize,
    events: Mutex<Vec<Invocation>>,
}

impl MockExecutor {
    fn with_version(output: &str) -> Self {
        Self::with_chunks(vec![Ok(output.as_bytes().to_vec())])
    }

    fn with_chunks(version_chunks: Vec<Result<Vec<u8>, ExecError>>) -> Self {
        Self {
            version_chunks,
            capture_error: None,
            exit_status: 0,
            captures: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    fn missing_program() -> Self {
        let mut mock = Self::with_chunks(Vec::new());
        mock.capture_error = Some(ExecError::ProgramNotFound("npm".to_string()));
        mock
    }

    fn exiting_with(mut self, status: i32) -> Self {
        self.exit_status = status;
        self
    }

    fn spawn_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst) + self.runs.load(Ordering::SeqCst)
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn capture_stdout(&self, invocation: &Invocation) -> Result<ChunkStream, ExecError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(invocation.clone());

        if let Some(err) = &self.capture_error {
            return Err(err.clone());
        }
        Ok(Box::pin(stream::iter(self.version_chunks.clone())))
    }

    async fn run_passthrough(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(invocation.clone());

        Ok(ProcessResult {
            status: self.exit_status,
            duration: Duration::from_millis(1),
        })
    }

    fn executor_type(&self) -> &'static str {
        "mock"
    }
}

fn runner(mock: &Arc<MockExecutor>) -> CommandRunner {
    CommandRunner::new(mock.clone(), "npm")
}

#[tokio::test]
async fn test_empty_command_spawns_nothing() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n"));

    let err = runner(&mock).run(&CommandSpec::new("")).await.unwrap_err();

    assert!(matches!(err, PackageError::ConfigError(_)));
    assert_eq!(mock.spawn_count(), 0);
}

#[tokio::test]
async fn test_version_with_trailing_text_is_accepted() {
    let mock = Arc::new(MockExecutor::with_version("7.2.1 extra text"));

    let result = runner(&mock)
        .run(&CommandSpec::new("install").with_args(["left-pad"]))
        .await
        .unwrap();

    assert!(result.success());
    assert_eq!(mock.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bad_version_output_stops_before_command() {
    let mock = Arc::new(MockExecutor::with_version("not-a-version"));

    let err = runner(&mock)
        .run(&CommandSpec::new("install"))
        .await
        .unwrap_err();

    match err {
        PackageError::ToolUnavailable { output } => assert_eq!(output, "not-a-version"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.captures.load(Ordering::SeqCst), 1);
    assert_eq!(mock.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_program_is_tool_unavailable() {
    let mock = Arc::new(MockExecutor::missing_program());

    let err = runner(&mock)
        .run(&CommandSpec::new("update"))
        .await
        .unwrap_err();

    assert!(err.is_tool_missing());
    assert_eq!(mock.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stream_error_is_propagated() {
    let mock = Arc::new(MockExecutor::with_chunks(vec![
        Ok(b"10.".to_vec()),
        Err(ExecError::IoError("pipe closed".to_string())),
        Ok(b"8.2\n".to_vec()),
    ]));

    let err = runner(&mock)
        .run(&CommandSpec::new("install"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PackageError::StreamReduction(ExecError::IoError(ref msg)) if msg == "pipe closed"
    ));
    assert_eq!(mock.runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_version_split_across_chunks() {
    let mock = Arc::new(MockExecutor::with_chunks(vec![
        Ok(b"10.".to_vec()),
        Ok(b"8".to_vec()),
        Ok(b".2\n".to_vec()),
    ]));

    let version = runner(&mock).check_tool().await.unwrap();

    assert_eq!(version.to_string(), "10.8.2");
    assert_eq!(version.raw, "10.8.2\n");
}

#[tokio::test]
async fn test_version_check_runs_before_command() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n"));
    let runner = runner(&mock).with_working_dir("/srv/app");

    let spec = CommandSpec::new("install")
        .with_args(["left-pad"])
        .with_option("loglevel", None)
        .with_option("production", Some(true.into()));
    runner.run(&spec).await.unwrap();

    let invocations = mock.invocations();
    assert_eq!(invocations.len(), 2);

    assert_eq!(invocations[0].args, ["-v"]);
    assert_eq!(
        invocations[1].args,
        ["install", "left-pad", "--production=true"]
    );
    for inv in &invocations {
        assert_eq!(inv.program, "npm");
        assert_eq!(inv.working_dir.as_deref(), Some(Path::new("/srv/app")));
    }
}

#[tokio::test]
async fn test_nonzero_exit_ignored_by_default() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n").exiting_with(1));

    let result = runner(&mock)
        .run(&CommandSpec::new("install"))
        .await
        .unwrap();

    assert_eq!(result.status, 1);
}

#[tokio::test]
async fn test_nonzero_exit_fails_under_fail_policy() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n").exiting_with(1));

    let err = runner(&mock)
        .with_exit_policy(ExitStatusPolicy::Fail)
        .run(&CommandSpec::new("install").with_args(["left-pad"]))
        .await
        .unwrap_err();

    match err {
        PackageError::CommandFailed { status, command } => {
            assert_eq!(status, 1);
            assert_eq!(command, "npm install left-pad");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_npm_manager_install_and_update() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n"));
    let manager = NpmManager::builder().executor(mock.clone()).build();

    let options = NpmOptions::new()
        .with_dependencies(["left-pad"])
        .production(true)
        .loglevel("silent");
    manager.install(&options).await.unwrap();

    let update = NpmOptions::new();
    manager.update(&update).await.unwrap();
    manager.update(&update).await.unwrap();

    let commands: Vec<String> = mock
        .invocations()
        .iter()
        .filter(|inv| inv.args.first().map(String::as_str) != Some("-v"))
        .map(ToString::to_string)
        .collect();

    assert_eq!(
        commands,
        [
            "npm install left-pad --production=true --loglevel=silent",
            "npm update --production=false",
            "npm update --production=false",
        ]
    );
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let mock = Arc::new(MockExecutor::with_version("10.8.2\n"));
    let runner = runner(&mock);

    let install = CommandSpec::new("install");
    let update = CommandSpec::new("update");
    let (a, b) = tokio::join!(runner.run(&install), runner.run(&update));

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(mock.captures.load(Ordering::SeqCst), 2);
    assert_eq!(mock.runs.load(Ordering::SeqCst), 2);
}
