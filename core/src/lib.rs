//! Subtask orchestration engine.
//!
//! A task description is decomposed into subtasks by a completion service,
//! the subtasks are executed (parallel, sequential or dependency-layered) and
//! their outputs merged into one result. Single prompt-template skills run
//! through the same completion service.

pub mod api;
pub mod completion;
pub mod config;
pub mod decomposer;
pub mod error;
pub mod executor;
pub mod merger;
pub mod skills;
