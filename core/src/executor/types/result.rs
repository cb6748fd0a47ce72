use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::ExecutionMode;

/// Result of executing a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task identifier
    pub task_id: String,

    pub success: bool,

    /// Generated text (empty on failure)
    pub content: String,

    /// Error message (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock time spent on the request. Zero in parallel mode, where
    /// requests overlap.
    #[serde(rename = "execution_time_ms", with = "duration_ms")]
    pub execution_time: Duration,
}

impl TaskResult {
    pub fn succeeded(task_id: impl Into<String>, content: String, execution_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            content,
            error: None,
            execution_time,
        }
    }

    pub fn failed(task_id: impl Into<String>, error: String, execution_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            content: String::new(),
            error: Some(error),
            execution_time,
        }
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time.as_millis() as u64
    }
}

/// Result of executing a task list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub run_id: String,

    pub mode: ExecutionMode,

    /// Number of tasks handed to the executor
    pub total_tasks: usize,

    pub successful_tasks: usize,

    pub failed_tasks: usize,

    /// One result per task, in input order
    pub results: Vec<TaskResult>,

    /// Output of the merge step; `None` when there was nothing to merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_content: Option<String>,

    #[serde(rename = "total_execution_time_ms", with = "duration_ms")]
    pub total_execution_time: Duration,
}

impl AggregatedResult {
    pub fn new(
        run_id: String,
        mode: ExecutionMode,
        total_tasks: usize,
        results: Vec<TaskResult>,
        merged_content: Option<String>,
        total_execution_time: Duration,
    ) -> Self {
        let successful_tasks = results.iter().filter(|r| r.success).count();
        let failed_tasks = results.iter().filter(|r| !r.success).count();
        Self {
            run_id,
            mode,
            total_tasks,
            successful_tasks,
            failed_tasks,
            results,
            merged_content,
            total_execution_time,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_tasks == 0
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
