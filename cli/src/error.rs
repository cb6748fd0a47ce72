use subagent_core::api::{ExecutorError, SkillError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("execution failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("skill error: {0}")]
    Skill(#[from] SkillError),
    #[error("invalid task list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    // 0: success
    // 1: finished, but at least one subtask failed (not an error)
    // 11: config error
    // 12: invalid task graph (cycle, duplicate id, unknown dependency)
    // 13: unknown skill
    // 20: IO error
    // 50: internal/uncategorized
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 11,
            CliError::Executor(e) => e.exit_code(),
            CliError::Skill(e) => e.exit_code(),
            CliError::Json(_) => 12,
            CliError::Io(_) => 20,
            CliError::Anyhow(_) => 50,
        }
    }
}
