use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::completion::{CompletionService, Message};
use crate::decomposer::TaskDecomposer;
use crate::error::ExecutorError;
use crate::merger::ResultMerger;

use super::graph::DependencyGraph;
use super::progress::ProgressMonitor;
use super::scheduler::run_bounded;
use super::traits::{ExecutionEvent, ExecutionObserver};
use super::types::{
    AggregatedResult, DecompositionConstraints, ExecutionMode, ExecutorConfig, MergeStrategy,
    Task, TaskResult,
};

/// Runs task lists against a completion service and merges the results.
pub struct ExecutionEngine {
    service: Arc<dyn CompletionService>,
    config: ExecutorConfig,
    decomposer: TaskDecomposer,
    merger: ResultMerger,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

pub struct ExecutionEngineBuilder {
    service: Arc<dyn CompletionService>,
    config: ExecutorConfig,
    constraints: DecompositionConstraints,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl ExecutionEngineBuilder {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            config: ExecutorConfig::default(),
            constraints: DecompositionConstraints::default(),
            observer: None,
        }
    }

    pub fn config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn constraints(mut self, constraints: DecompositionConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> ExecutionEngine {
        ExecutionEngine {
            decomposer: TaskDecomposer::with_constraints(self.service.clone(), self.constraints),
            merger: ResultMerger::new(self.service.clone()),
            service: self.service,
            config: self.config,
            observer: self.observer,
        }
    }
}

impl ExecutionEngine {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        ExecutionEngineBuilder::new(service).build()
    }

    pub fn builder(service: Arc<dyn CompletionService>) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(service)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn decomposer(&self) -> &TaskDecomposer {
        &self.decomposer
    }

    pub fn merger(&self) -> &ResultMerger {
        &self.merger
    }

    /// Execute `tasks` under `mode` and merge with the configured strategy.
    pub async fn execute(
        &self,
        tasks: &[Task],
        mode: ExecutionMode,
    ) -> Result<AggregatedResult, ExecutorError> {
        self.execute_with_strategy(tasks, mode, self.config.merge_strategy)
            .await
    }

    /// Decompose `description` and execute the resulting plan.
    ///
    /// Fails before decomposition when the completion service is not
    /// configured, so no fallback plan is produced in that case.
    pub async fn decompose_and_execute(
        &self,
        description: &str,
        context: Option<&str>,
        mode: ExecutionMode,
    ) -> Result<AggregatedResult, ExecutorError> {
        self.ensure_configured()?;
        let tasks = self.decomposer.decompose(description, context, None).await;
        self.execute(&tasks, mode).await
    }

    pub async fn execute_with_strategy(
        &self,
        tasks: &[Task],
        mode: ExecutionMode,
        strategy: MergeStrategy,
    ) -> Result<AggregatedResult, ExecutorError> {
        self.ensure_configured()?;
        ensure_unique_ids(tasks)?;

        let layers = plan_layers(tasks, mode)?;
        let run_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        tracing::info!(
            target: "subagent.executor",
            run_id = %run_id,
            mode = %mode,
            tasks = tasks.len(),
            layers = layers.len(),
            max_concurrency = self.config.max_concurrency,
            "starting execution"
        );
        self.emit(ExecutionEvent::RunStart {
            run_id: run_id.clone(),
            mode,
            total_tasks: tasks.len(),
        });
        self.emit(ExecutionEvent::Plan {
            run_id: run_id.clone(),
            layers: layers
                .iter()
                .map(|layer| layer.iter().map(|&idx| tasks[idx].id.clone()).collect())
                .collect(),
        });

        let mut progress =
            ProgressMonitor::new(tasks.len(), layers.len(), self.config.progress_bar);
        let mut slots: Vec<Option<TaskResult>> = vec![None; tasks.len()];

        for (layer_idx, layer) in layers.iter().enumerate() {
            let layer_tasks: Vec<&Task> = layer.iter().map(|&idx| &tasks[idx]).collect();

            let task_ids: Vec<String> = layer_tasks.iter().map(|t| t.id.clone()).collect();
            progress.start_layer(layer_idx, &task_ids);
            self.emit(ExecutionEvent::LayerStart {
                run_id: run_id.clone(),
                layer: layer_idx,
                task_ids,
            });
            for task in &layer_tasks {
                self.emit(ExecutionEvent::TaskStart {
                    run_id: run_id.clone(),
                    task_id: task.id.clone(),
                    layer: layer_idx,
                });
            }

            let results = match mode {
                ExecutionMode::Parallel => self.execute_batch(&layer_tasks).await,
                ExecutionMode::Sequential | ExecutionMode::Hybrid => {
                    let service = self.service.as_ref();
                    run_bounded(layer_tasks.clone(), self.config.max_concurrency, |_, task| {
                        execute_single_task(service, task)
                    })
                    .await
                }
            };

            for (&idx, result) in layer.iter().zip(results) {
                progress.complete_task(&result.task_id, result.success, result.execution_time_ms());
                if !result.success {
                    tracing::warn!(
                        target: "subagent.executor",
                        run_id = %run_id,
                        task_id = %result.task_id,
                        error = result.error.as_deref().unwrap_or_default(),
                        "task failed"
                    );
                }
                self.emit(ExecutionEvent::TaskComplete {
                    run_id: run_id.clone(),
                    layer: layer_idx,
                    result: result.clone(),
                });
                slots[idx] = Some(result);
            }

            self.emit(ExecutionEvent::LayerEnd {
                run_id: run_id.clone(),
                layer: layer_idx,
            });
        }

        let results: Vec<TaskResult> = slots.into_iter().flatten().collect();
        progress.finish();

        let merged = if results.is_empty() {
            None
        } else {
            self.emit(ExecutionEvent::Merge {
                run_id: run_id.clone(),
                strategy,
            });
            Some(self.merger.merge(&results, strategy).await)
        };

        let aggregate = AggregatedResult::new(
            run_id.clone(),
            mode,
            tasks.len(),
            results,
            merged,
            start.elapsed(),
        );

        tracing::info!(
            target: "subagent.executor",
            run_id = %run_id,
            successful = aggregate.successful_tasks,
            failed = aggregate.failed_tasks,
            duration_ms = aggregate.total_execution_time.as_millis() as u64,
            "execution finished"
        );
        self.emit(ExecutionEvent::RunEnd {
            run_id,
            result: aggregate.clone(),
        });

        Ok(aggregate)
    }

    /// Parallel mode: one bulk call, timing recorded as zero since requests
    /// overlap.
    async fn execute_batch(&self, tasks: &[&Task]) -> Vec<TaskResult> {
        let requests = tasks
            .iter()
            .map(|task| vec![Message::user(task.prompt.clone())])
            .collect();

        self.service
            .send_batch(requests, self.config.max_concurrency)
            .await
            .into_iter()
            .zip(tasks)
            .map(|(outcome, task)| match outcome {
                Ok(content) => TaskResult::succeeded(task.id.clone(), content, Duration::ZERO),
                Err(err) => TaskResult::failed(task.id.clone(), err.to_string(), Duration::ZERO),
            })
            .collect()
    }

    fn ensure_configured(&self) -> Result<(), ExecutorError> {
        if self.service.is_configured() {
            Ok(())
        } else {
            Err(ExecutorError::Configuration(format!(
                "completion service '{}' is not configured",
                self.service.name()
            )))
        }
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

/// Send one task as a single user message and time it.
pub async fn execute_single_task(service: &dyn CompletionService, task: &Task) -> TaskResult {
    let start = Instant::now();
    tracing::debug!(target: "subagent.executor", task_id = %task.id, "task started");

    match service.send_once(&[Message::user(task.prompt.clone())]).await {
        Ok(content) => TaskResult::succeeded(task.id.clone(), content, start.elapsed()),
        Err(err) => TaskResult::failed(task.id.clone(), err.to_string(), start.elapsed()),
    }
}

/// Execute tasks with default settings and the given mode.
pub async fn execute_tasks(
    service: Arc<dyn CompletionService>,
    tasks: &[Task],
    mode: ExecutionMode,
) -> Result<AggregatedResult, ExecutorError> {
    ExecutionEngine::new(service).execute(tasks, mode).await
}

fn ensure_unique_ids(tasks: &[Task]) -> Result<(), ExecutorError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(ExecutorError::DuplicateTaskId(task.id.clone()));
        }
    }
    Ok(())
}

/// Layers of input indices. Parallel is a single layer, Sequential one layer
/// per task, Hybrid the dependency layers of the graph.
fn plan_layers(tasks: &[Task], mode: ExecutionMode) -> Result<Vec<Vec<usize>>, ExecutorError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    match mode {
        ExecutionMode::Parallel => Ok(vec![(0..tasks.len()).collect()]),
        ExecutionMode::Sequential => Ok((0..tasks.len()).map(|idx| vec![idx]).collect()),
        ExecutionMode::Hybrid => {
            let graph = DependencyGraph::from_tasks(tasks);
            graph
                .layers()?
                .into_iter()
                .map(|layer| {
                    layer
                        .iter()
                        .map(|id| {
                            graph.position(id).ok_or_else(|| {
                                ExecutorError::Runner(format!("task not found: {}", id))
                            })
                        })
                        .collect()
                })
                .collect()
        }
    }
}
