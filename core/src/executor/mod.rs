//! Dependency-aware parallel executor
//!
//! Runs a task list against a [`CompletionService`](crate::completion::CompletionService)
//! under one of three modes and merges the per-task results.
//!
//! # Architecture
//!
//! ```text
//! Vec<Task>
//!   ↓
//! plan_layers()          Parallel: one layer | Sequential: one task per layer
//!   ↓                    Hybrid: DependencyGraph::layers() (Kahn, cycle → error)
//! for each layer:
//!   run_bounded() / send_batch()   (at most max_concurrency in flight)
//!   ↓
//! results written back at their input index
//!   ↓
//! ResultMerger::merge() → AggregatedResult
//! ```
//!
//! Task failures are recorded as data; only configuration and graph errors
//! abort a run.

mod engine;
mod graph;
pub mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::{execute_single_task, execute_tasks, ExecutionEngine, ExecutionEngineBuilder};
pub use graph::DependencyGraph;
pub use progress::ProgressMonitor;
pub use scheduler::run_bounded;
pub use traits::{ExecutionEvent, ExecutionObserver};
pub use types::{
    AggregatedResult, DecompositionConstraints, ExecutionMode, ExecutorConfig, MergeStrategy,
    Task, TaskResult, DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_SUB_TASKS,
};
