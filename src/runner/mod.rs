//! Task execution engine
//!
//! This module holds the task registry, the incremental filter and the executor that
//! walks execution plans.

pub mod executor;
pub mod incremental;
pub mod registry;
pub mod report;
pub mod shutdown;

// Re-export main types
pub use executor::{Executor, RunOptions};
pub use incremental::{Decision, IncrementalFilter};
pub use registry::{AliasTask, LeafAction, Plan, TaskNode, TaskRegistry, NEWER_PREFIX};
pub use report::{ActionResult, Outcome, RunReport};
pub use shutdown::Shutdown;
