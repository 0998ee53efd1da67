//! npmkit-pkg: Package manager abstraction
//!
//! Turns structured options into npm command lines and runs them through
//! an `npmkit-exec` executor.

pub mod error;
pub mod npm;
pub mod runner;
pub mod traits;
pub mod types;

pub use error::PackageError;
pub use npmkit_exec::ProcessResult;
pub use npm::{NpmManager, NpmManagerBuilder};
pub use runner::{CommandRunner, RunState};
pub use traits::PackageManager;
pub use types::{
    CmdOptions, CommandSpec, ExitStatusPolicy, NpmOptions, OptionValue, PackageManagerType,
    ToolVersion,
};
