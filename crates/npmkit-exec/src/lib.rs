//! npmkit-exec: Local process execution
//!
//! Spawns external tools with an explicit argument vector, streams their
//! output, and folds chunk streams into single values.

pub mod error;
pub mod local;
pub mod reduce;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use reduce::{Reducer, concat, concat_str, reduce_stream};
pub use result::{Invocation, ProcessResult};
pub use traits::{ChunkStream, Executor};
