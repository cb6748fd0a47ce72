//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `subagent_core::api` instead of reaching into internal modules.

pub use crate::completion::{CompletionService, Message, Role};
pub use crate::config::{
    load_default, load_from_path, AppConfig, LoggingConfig, ProviderConfig, ProviderKind,
    ProviderPreset, SkillConfig,
};
pub use crate::decomposer::{fallback_plan, TaskDecomposer, FALLBACK_TASK_ID};
pub use crate::error::{CompletionError, DecompositionError, ExecutorError, SkillError};
pub use crate::executor::{
    execute_tasks, AggregatedResult, DecompositionConstraints, DependencyGraph, ExecutionEngine,
    ExecutionEngineBuilder, ExecutionEvent, ExecutionMode, ExecutionObserver, ExecutorConfig,
    MergeStrategy, ProgressMonitor, Task, TaskResult,
};
pub use crate::merger::{concatenate, custom_structure, ResultMerger};
pub use crate::skills::{
    SkillCategory, SkillContext, SkillDefinition, SkillRegistry, SkillResult,
};
