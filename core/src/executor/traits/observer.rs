use crate::executor::types::{AggregatedResult, ExecutionMode, MergeStrategy, TaskResult};

/// Execution observer plugin (presentation hook)
///
/// Called synchronously from the scheduler; implementations should not block.
pub trait ExecutionObserver: Send + Sync {
    fn name(&self) -> &str;
    fn on_event(&self, event: &ExecutionEvent);
}

/// Lifecycle events of one `execute` call
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStart {
        run_id: String,
        mode: ExecutionMode,
        total_tasks: usize,
    },
    Plan {
        run_id: String,
        layers: Vec<Vec<String>>,
    },
    LayerStart {
        run_id: String,
        layer: usize,
        task_ids: Vec<String>,
    },
    TaskStart {
        run_id: String,
        task_id: String,
        layer: usize,
    },
    TaskComplete {
        run_id: String,
        layer: usize,
        result: TaskResult,
    },
    LayerEnd {
        run_id: String,
        layer: usize,
    },
    Merge {
        run_id: String,
        strategy: MergeStrategy,
    },
    RunEnd {
        run_id: String,
        result: AggregatedResult,
    },
}

impl ExecutionEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::Plan { run_id, .. }
            | Self::LayerStart { run_id, .. }
            | Self::TaskStart { run_id, .. }
            | Self::TaskComplete { run_id, .. }
            | Self::LayerEnd { run_id, .. }
            | Self::Merge { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }

    /// Dotted event name used by machine-readable renderers.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::Plan { .. } => "executor.plan",
            Self::LayerStart { .. } => "layer.start",
            Self::TaskStart { .. } => "task.start",
            Self::TaskComplete { .. } => "task.end",
            Self::LayerEnd { .. } => "layer.end",
            Self::Merge { .. } => "merge.start",
            Self::RunEnd { .. } => "run.end",
        }
    }
}
