//! Error types for npmkit-pkg

use npmkit_exec::ExecError;
use thiserror::Error;

/// Errors that can occur during package manager operations
#[derive(Error, Debug, Clone)]
pub enum PackageError {
    /// Invalid configuration (raised before anything is spawned)
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// The tool is missing or its version query printed something unexpected
    #[error("package manager not found or not usable (version output: {output:?})")]
    ToolUnavailable {
        /// Raw output of the version query
        output: String,
    },

    /// The version query's output stream failed while being read
    #[error("failed to read tool output: {0}")]
    StreamReduction(#[source] ExecError),

    /// Spawning or waiting on the package manager failed
    #[error("execution error: {0}")]
    ExecutionError(#[source] ExecError),

    /// Command exited non-zero (only under `ExitStatusPolicy::Fail`)
    #[error("command failed: {status} - {command}")]
    CommandFailed {
        /// Exit status
        status: i32,
        /// Rendered command line
        command: String,
    },
}

impl PackageError {
    /// Check if error means the package manager itself could not be used
    #[must_use]
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, PackageError::ToolUnavailable { .. })
    }
}
