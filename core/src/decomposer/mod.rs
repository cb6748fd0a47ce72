//! Task decomposition
//!
//! Turns one natural-language task description into a bounded list of
//! subtasks by asking the completion service for a JSON plan.
//!
//! ```text
//! description (+ context)
//!   ↓
//! system + user prompt → CompletionService::send_once
//!   ↓
//! extract_json() → parse_subtasks()
//!   ↓
//! apply_constraints()  (truncate, strip or prune dependencies)
//!   ↓
//! Vec<Task>            (or a single fallback task on any failure)
//! ```

mod parse;
mod prompt;

use std::collections::HashSet;
use std::sync::Arc;

use crate::completion::{CompletionService, Message};
use crate::error::{CompletionError, DecompositionError};
use crate::executor::types::{DecompositionConstraints, Task};
use crate::executor::DependencyGraph;

pub use parse::{extract_json, parse_subtasks};
pub use prompt::{fallback_prompt, system_prompt, user_prompt};

/// Id of the single task produced when decomposition fails.
pub const FALLBACK_TASK_ID: &str = "task-1";

pub struct TaskDecomposer {
    service: Arc<dyn CompletionService>,
    defaults: DecompositionConstraints,
}

impl TaskDecomposer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self::with_constraints(service, DecompositionConstraints::default())
    }

    /// Use `defaults` whenever `decompose` is called without constraints.
    pub fn with_constraints(
        service: Arc<dyn CompletionService>,
        defaults: DecompositionConstraints,
    ) -> Self {
        Self { service, defaults }
    }

    pub fn default_constraints(&self) -> &DecompositionConstraints {
        &self.defaults
    }

    /// Split a task description into subtasks.
    ///
    /// Never fails: any problem with the backend or its response degrades to a
    /// single task carrying the original description and context.
    pub async fn decompose(
        &self,
        description: &str,
        context: Option<&str>,
        constraints: Option<&DecompositionConstraints>,
    ) -> Vec<Task> {
        match self.try_decompose(description, context, constraints).await {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::warn!(
                    target: "subagent.decomposer",
                    error = %err,
                    backend = self.service.name(),
                    "decomposition failed, falling back to a single task"
                );
                fallback_plan(description, context)
            }
        }
    }

    /// Like [`decompose`](Self::decompose) but reports why a plan could not be
    /// produced instead of falling back.
    pub async fn try_decompose(
        &self,
        description: &str,
        context: Option<&str>,
        constraints: Option<&DecompositionConstraints>,
    ) -> Result<Vec<Task>, DecompositionError> {
        let constraints = constraints.unwrap_or(&self.defaults);

        if !self.service.is_configured() {
            return Err(CompletionError::NotConfigured(self.service.name().to_string()).into());
        }

        let messages = [
            Message::system(system_prompt(constraints.max_sub_tasks.max(1))),
            Message::user(user_prompt(description, context)),
        ];

        tracing::debug!(
            target: "subagent.decomposer",
            backend = self.service.name(),
            description_len = description.len(),
            max_sub_tasks = constraints.max_sub_tasks,
            allow_dependencies = constraints.allow_dependencies,
            "requesting decomposition"
        );

        let response = self.service.send_once(&messages).await?;
        let tasks = parse_subtasks(&response)?;
        let tasks = apply_constraints(tasks, constraints);

        tracing::info!(
            target: "subagent.decomposer",
            subtasks = tasks.len(),
            "decomposed task"
        );
        Ok(tasks)
    }

    /// Build the dependency graph of a plan.
    pub fn build_dependency_graph(&self, tasks: &[Task]) -> DependencyGraph {
        DependencyGraph::from_tasks(tasks)
    }
}

/// The single-task plan used when decomposition is impossible.
pub fn fallback_plan(description: &str, context: Option<&str>) -> Vec<Task> {
    vec![Task::new(
        FALLBACK_TASK_ID,
        description,
        fallback_prompt(description, context),
    )]
}

/// Truncate to `max_sub_tasks` (keeping order) and enforce
/// `allow_dependencies`. Dependencies on ids that are not part of the
/// resulting plan are dropped so the plan is always a closed graph.
pub fn apply_constraints(mut tasks: Vec<Task>, constraints: &DecompositionConstraints) -> Vec<Task> {
    tasks.truncate(constraints.max_sub_tasks.max(1));

    if !constraints.allow_dependencies {
        for task in &mut tasks {
            task.dependencies.clear();
        }
        return tasks;
    }

    let known: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    for task in &mut tasks {
        let before = task.dependencies.len();
        task.dependencies.retain(|dep| known.contains(dep));
        if task.dependencies.len() != before {
            tracing::warn!(
                target: "subagent.decomposer",
                task_id = %task.id,
                dropped = before - task.dependencies.len(),
                "pruned dependencies on subtasks outside the plan"
            );
        }
    }
    tasks
}
