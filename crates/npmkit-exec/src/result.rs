//! Result and request types for process execution

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a finished process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Exit status code (0 for success, -1 when killed by a signal)
    pub status: i32,
    /// Time taken from spawn to exit
    pub duration: Duration,
}

impl ProcessResult {
    /// Check if process succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// A program plus its argument vector
///
/// Arguments are handed to the OS as-is; no shell ever sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory for the child (inherits the host's when `None`)
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Create a new invocation with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Append a single argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the working directory if one is given
    #[must_use]
    pub fn with_optional_working_dir(mut self, dir: Option<&Path>) -> Self {
        self.working_dir = dir.map(Path::to_path_buf);
        self
    }

    /// Arguments as OS strings, for `Command::args`
    pub fn os_args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsStr::new)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let inv = Invocation::new("npm").arg("install").args(["left-pad", "--production=true"]);
        assert_eq!(inv.to_string(), "npm install left-pad --production=true");
    }

    #[test]
    fn test_process_result_success() {
        let ok = ProcessResult {
            status: 0,
            duration: Duration::from_millis(3),
        };
        let failed = ProcessResult { status: 1, ..ok };
        assert!(ok.success());
        assert!(!failed.success());
    }
}
