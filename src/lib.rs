#![deny(missing_docs)]

//! A bounded worker thread pool with fixed and elastic sizing.
//!
//! Tasks are submitted to a capacity-limited FIFO queue and executed
//! by a managed set of worker threads. In elastic mode the pool grows
//! under backlog pressure up to a ceiling and shrinks back through
//! idle-timeout reclamation. Each submission returns a
//! [`ResultHandle`], a one-shot future through which the executing
//! worker delivers the task's type-erased output.

mod error;
mod handle;
mod pool;
mod queue;
mod task;
mod value;
mod worker;

pub use error::{PoolError, Result};
pub use handle::ResultHandle;
pub use pool::{PoolMode, ThreadPool};
pub use value::{TaskOutput, TaskValue};
