//! Running package manager commands
//!
//! [`CommandRunner`] performs one command per call: it checks that the tool
//! answers its version query, builds the argument vector from a
//! [`CommandSpec`], spawns it with stderr forwarded, and resolves once the
//! child exits.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use npmkit_exec::{Executor, Invocation, LocalExecutor, ProcessResult, concat};
use tracing::{debug, info, instrument, warn};

use crate::error::PackageError;
use crate::types::{CommandSpec, ExitStatusPolicy, ToolVersion};

/// Flag passed to the tool to query its version
const VERSION_FLAG: &str = "-v";

/// Stage of a single `run` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing done yet
    Idle,
    /// Waiting on the tool's version query
    ValidatingTool,
    /// Tool confirmed, building the argument vector
    ConstructingCommand,
    /// Command running, stderr being forwarded
    Spawned,
    /// Command exited
    Completed,
    /// Stopped before the command could run to exit
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::ValidatingTool => "validating_tool",
            RunState::ConstructingCommand => "constructing_command",
            RunState::Spawned => "spawned",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Executes package manager commands through an [`Executor`]
#[derive(Clone)]
pub struct CommandRunner {
    executor: Arc<dyn Executor>,
    program: String,
    working_dir: Option<PathBuf>,
    exit_policy: ExitStatusPolicy,
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("executor", &self.executor.executor_type())
            .field("program", &self.program)
            .field("working_dir", &self.working_dir)
            .field("exit_policy", &self.exit_policy)
            .finish()
    }
}

impl CommandRunner {
    /// Create a runner for `program` backed by `executor`
    pub fn new(executor: Arc<dyn Executor>, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
            working_dir: None,
            exit_policy: ExitStatusPolicy::default(),
        }
    }

    /// Create a runner that spawns `program` locally
    pub fn local(program: impl Into<String>) -> Self {
        Self::new(Arc::new(LocalExecutor::new()), program)
    }

    /// Run every command in `dir` instead of the host's current directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Choose how a non-zero exit status is reported
    #[must_use]
    pub fn with_exit_policy(mut self, policy: ExitStatusPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    /// Program this runner invokes
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Working directory, if one was set
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Exit status policy in effect
    pub fn exit_policy(&self) -> ExitStatusPolicy {
        self.exit_policy
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(&self.program)
            .args(args)
            .with_optional_working_dir(self.working_dir())
    }

    /// Confirm the tool is installed and reports a version
    ///
    /// # Errors
    /// - `PackageError::ToolUnavailable` if the tool is missing or its output
    ///   does not start with a `major.minor.patch` triple
    /// - `PackageError::StreamReduction` if reading its output fails
    /// - `PackageError::ExecutionError` if it cannot be spawned for another reason
    #[instrument(skip(self), fields(program = %self.program))]
    pub async fn check_tool(&self) -> Result<ToolVersion, PackageError> {
        let invocation = self.invocation(vec![VERSION_FLAG.to_string()]);

        let stdout = match self.executor.capture_stdout(&invocation).await {
            Ok(stream) => stream,
            Err(e) if e.is_not_found() => {
                warn!(error = %e, "package manager not installed");
                return Err(PackageError::ToolUnavailable {
                    output: String::new(),
                });
            }
            Err(e) => return Err(PackageError::ExecutionError(e)),
        };

        let bytes = concat()
            .reduce(stdout)
            .await
            .map_err(PackageError::StreamReduction)?;
        let output = String::from_utf8_lossy(&bytes).into_owned();

        match ToolVersion::parse(&output) {
            Some(version) => {
                debug!(version = %version, "package manager available");
                Ok(version)
            }
            None => {
                warn!(output = %output.trim_end(), "unexpected version output");
                Err(PackageError::ToolUnavailable { output })
            }
        }
    }

    /// Run `spec` to completion
    ///
    /// Resolves exactly once. Under `ExitStatusPolicy::Ignore` the result is
    /// `Ok` whatever the exit status; inspect [`ProcessResult::status`] if it
    /// matters.
    ///
    /// # Errors
    /// - `PackageError::ConfigError` if the command name is empty; nothing is spawned
    /// - any error from [`CommandRunner::check_tool`]; the command is not attempted
    /// - `PackageError::ExecutionError` if the command cannot be spawned or awaited
    /// - `PackageError::CommandFailed` for a non-zero exit under `ExitStatusPolicy::Fail`
    #[instrument(skip(self), fields(program = %self.program, command = %spec.command))]
    pub async fn run(&self, spec: &CommandSpec) -> Result<ProcessResult, PackageError> {
        let mut state = RunState::Idle;

        if spec.command.trim().is_empty() {
            transition(&mut state, RunState::Failed);
            return Err(PackageError::ConfigError(
                "command name is required".to_string(),
            ));
        }

        transition(&mut state, RunState::ValidatingTool);
        if let Err(e) = self.check_tool().await {
            transition(&mut state, RunState::Failed);
            return Err(e);
        }

        transition(&mut state, RunState::ConstructingCommand);
        let invocation = self.invocation(spec.argv());
        let command = invocation.to_string();

        transition(&mut state, RunState::Spawned);
        info!(command = %command, "running package manager");
        let result = match self.executor.run_passthrough(&invocation).await {
            Ok(result) => result,
            Err(e) => {
                transition(&mut state, RunState::Failed);
                return Err(PackageError::ExecutionError(e));
            }
        };

        transition(&mut state, RunState::Completed);

        if !result.success() {
            match self.exit_policy {
                ExitStatusPolicy::Ignore => {
                    warn!(command = %command, status = result.status, "command exited non-zero");
                }
                ExitStatusPolicy::Fail => {
                    return Err(PackageError::CommandFailed {
                        status: result.status,
                        command,
                    });
                }
            }
        }

        info!(
            command = %command,
            status = result.status,
            duration = ?result.duration,
            "package manager finished"
        );

        Ok(result)
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!(from = %state, to = %next, "run state");
    *state = next;
}
