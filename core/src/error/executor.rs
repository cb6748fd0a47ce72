use thiserror::Error;

/// Executor-specific errors for task graph construction and execution.
///
/// Only configuration-class problems live here. A single task failing is not
/// an error: it becomes a `TaskResult` with `success == false`.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Dependency not found: task '{task_id}' depends on '{missing_dep}'")]
    DependencyNotFound {
        task_id: String,
        missing_dep: String,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Runner error: {0}")]
    Runner(String),
}

impl ExecutorError {
    /// True for errors caused by the task list itself rather than the environment.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTaskId(_)
                | Self::DependencyNotFound { .. }
                | Self::CircularDependency(_)
        )
    }

    /// Map executor error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 11,
            Self::DuplicateTaskId(_) => 12,
            Self::DependencyNotFound { .. } => 12,
            Self::CircularDependency(_) => 12,
            Self::Runner(_) => 50,
        }
    }
}
