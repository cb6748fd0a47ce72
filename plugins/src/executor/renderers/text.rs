use subagent_core::executor::traits::{ExecutionEvent, ExecutionObserver};

/// Human-readable lifecycle lines on stderr, leaving stdout for the result.
pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn format_event(&self, event: &ExecutionEvent) -> String {
        match event {
            ExecutionEvent::RunStart {
                run_id,
                mode,
                total_tasks,
            } => format!("RUN START {} (mode: {}, tasks: {})", run_id, mode, total_tasks),
            ExecutionEvent::Plan { run_id, layers } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, layer) in layers.iter().enumerate() {
                    out.push_str(&format!("\n  layer {}: {}", idx, layer.join(", ")));
                }
                out
            }
            ExecutionEvent::LayerStart {
                run_id,
                layer,
                task_ids,
            } => format!(
                "LAYER START {} (layer {}, tasks: {})",
                run_id,
                layer,
                task_ids.len()
            ),
            ExecutionEvent::TaskStart {
                run_id,
                task_id,
                layer,
            } => format!("TASK START {} (layer {}, task {})", run_id, layer, task_id),
            ExecutionEvent::TaskComplete {
                run_id,
                layer,
                result,
            } => {
                let status = match (result.success, self.ascii_only) {
                    (true, true) => "OK",
                    (true, false) => "SUCCESS",
                    (false, true) => "FAIL",
                    (false, false) => "FAILED",
                };
                let mut line = format!(
                    "TASK END {} (layer {}, task {}, status {}, duration {}ms)",
                    run_id,
                    layer,
                    result.task_id,
                    status,
                    result.execution_time_ms()
                );
                if let Some(err) = &result.error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            ExecutionEvent::LayerEnd { run_id, layer } => {
                format!("LAYER END {} (layer {})", run_id, layer)
            }
            ExecutionEvent::Merge { run_id, strategy } => {
                format!("MERGE {} (strategy {})", run_id, strategy)
            }
            ExecutionEvent::RunEnd { run_id, result } => format!(
                "RUN END {} (successful {}, failed {}, duration {}ms)",
                run_id,
                result.successful_tasks,
                result.failed_tasks,
                result.total_execution_time.as_millis()
            ),
        }
    }
}

impl ExecutionObserver for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("{}", self.format_event(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use subagent_core::api::TaskResult;

    #[test]
    fn test_text_renderer_task_complete() {
        let renderer = TextRendererPlugin::new(true);
        let event = ExecutionEvent::TaskComplete {
            run_id: "run".to_string(),
            layer: 1,
            result: TaskResult::failed("task", "HTTP 500".into(), Duration::from_millis(5)),
        };

        let line = renderer.format_event(&event);
        assert!(line.contains("TASK END"));
        assert!(line.contains("status FAIL"));
        assert!(line.contains("duration 5ms"));
        assert!(line.ends_with(": HTTP 500"));
    }

    #[test]
    fn test_text_renderer_plan_lists_layers() {
        let renderer = TextRendererPlugin::new(false);
        let event = ExecutionEvent::Plan {
            run_id: "run".to_string(),
            layers: vec![vec!["a".into()], vec!["b".into(), "c".into()]],
        };

        let text = renderer.format_event(&event);
        assert!(text.contains("layer 0: a"));
        assert!(text.contains("layer 1: b, c"));
    }
}
