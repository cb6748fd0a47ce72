use thiserror::Error;

use super::completion::CompletionError;

/// Reasons a decomposition response could not be turned into a plan.
///
/// Never surfaced past `TaskDecomposer::decompose`, which falls back to a
/// single-task plan. Exposed so callers of the lower-level parse functions can
/// inspect what went wrong.
#[derive(Error, Debug)]
pub enum DecompositionError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("invalid JSON in response: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response has no `subtasks` array")]
    MissingSubtasks,

    #[error("response contains an empty `subtasks` array")]
    EmptyPlan,

    #[error("subtask id `{0}` appears more than once")]
    DuplicateId(String),

    #[error("decomposition request failed: {0}")]
    Completion(#[from] CompletionError),
}
