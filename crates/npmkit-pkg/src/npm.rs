//! npm package manager (Node.js)

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use npmkit_exec::{Executor, LocalExecutor, ProcessResult};
use tracing::{info, instrument};

use crate::error::PackageError;
use crate::runner::CommandRunner;
use crate::traits::PackageManager;
use crate::types::{CommandSpec, ExitStatusPolicy, NpmOptions, PackageManagerType, ToolVersion};

/// Default program name
pub const DEFAULT_PROGRAM: &str = "npm";

/// npm package manager implementation
#[derive(Debug, Clone)]
pub struct NpmManager {
    runner: CommandRunner,
}

impl NpmManager {
    /// Create a manager that runs `npm` locally in the host's current directory
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a manager
    #[must_use]
    pub fn builder() -> NpmManagerBuilder {
        NpmManagerBuilder::default()
    }

    /// Underlying command runner
    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Build the `npm install` command
    #[must_use]
    pub fn install_spec(options: &NpmOptions) -> CommandSpec {
        CommandSpec::new("install")
            .with_args(options.dependencies.iter().cloned())
            .with_options(options.to_cmd_options())
    }

    /// Build the `npm update` command
    #[must_use]
    pub fn update_spec(options: &NpmOptions) -> CommandSpec {
        CommandSpec::new("update").with_options(options.to_cmd_options())
    }
}

impl Default for NpmManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageManager for NpmManager {
    #[instrument(skip(self, options), fields(dependencies = ?options.dependencies))]
    async fn install(&self, options: &NpmOptions) -> Result<ProcessResult, PackageError> {
        info!("starting npm install");
        self.runner.run(&Self::install_spec(options)).await
    }

    #[instrument(skip(self, options))]
    async fn update(&self, options: &NpmOptions) -> Result<ProcessResult, PackageError> {
        info!("starting npm update");
        self.runner.run(&Self::update_spec(options)).await
    }

    async fn check_tool(&self) -> Result<ToolVersion, PackageError> {
        self.runner.check_tool().await
    }

    fn manager_type(&self) -> PackageManagerType {
        PackageManagerType::Npm
    }
}

/// Builder for `NpmManager`
#[derive(Default)]
pub struct NpmManagerBuilder {
    program: Option<String>,
    working_dir: Option<PathBuf>,
    exit_policy: ExitStatusPolicy,
    executor: Option<Arc<dyn Executor>>,
}

impl NpmManagerBuilder {
    /// Use a different npm binary (path or name on `PATH`)
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Run npm in `dir`
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Choose how a non-zero exit status is reported
    #[must_use]
    pub fn exit_policy(mut self, policy: ExitStatusPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    /// Spawn through a custom executor
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the manager
    #[must_use]
    pub fn build(self) -> NpmManager {
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(LocalExecutor::new()));
        let program = self.program.unwrap_or_else(|| DEFAULT_PROGRAM.to_string());

        let mut runner = CommandRunner::new(executor, program).with_exit_policy(self.exit_policy);
        if let Some(dir) = self.working_dir {
            runner = runner.with_working_dir(dir);
        }

        NpmManager { runner }
    }
}
