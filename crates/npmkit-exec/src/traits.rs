//! Executor trait

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ExecError;
use crate::result::{Invocation, ProcessResult};

/// Ordered stream of output chunks from a child process
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ExecError>> + Send>>;

/// Spawns processes on behalf of a package manager
///
/// Implementations must never route the invocation through a shell.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Spawn `invocation` and hand back its stdout as a chunk stream
    ///
    /// Stderr is discarded. The stream ends when the child closes stdout.
    async fn capture_stdout(&self, invocation: &Invocation) -> Result<ChunkStream, ExecError>;

    /// Spawn `invocation`, forward its stderr to ours as it arrives, and wait
    /// for it to exit
    ///
    /// A non-zero exit status is not an error at this layer.
    async fn run_passthrough(&self, invocation: &Invocation) -> Result<ProcessResult, ExecError>;

    /// Short name for diagnostics
    fn executor_type(&self) -> &'static str;
}
