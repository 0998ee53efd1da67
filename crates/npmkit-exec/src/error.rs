//! Error types for npmkit-exec

use std::io;

use thiserror::Error;

/// Errors that can occur while spawning or driving a local process
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Program is not on `PATH` (or the path does not exist)
    #[error("program not found: {0}")]
    ProgramNotFound(String),

    /// Program exists but may not be executed
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error while reading from or waiting on the child
    #[error("I/O error: {0}")]
    IoError(String),

    /// A pipe that should have been configured was not available
    #[error("child {0} pipe not available")]
    MissingPipe(&'static str),
}

impl ExecError {
    /// Classify a spawn failure for `program`
    #[must_use]
    pub fn from_spawn(program: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ExecError::ProgramNotFound(program.to_string()),
            io::ErrorKind::PermissionDenied => ExecError::PermissionDenied(program.to_string()),
            _ => ExecError::SpawnError(format!("{program}: {err}")),
        }
    }

    /// Check if the program itself could not be located
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::ProgramNotFound(_))
    }
}

impl From<io::Error> for ExecError {
    fn from(err: io::Error) -> Self {
        ExecError::IoError(err.to_string())
    }
}
