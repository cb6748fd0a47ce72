use chrono::Local;
use serde_json::{json, Value};
use subagent_core::executor::traits::{ExecutionEvent, ExecutionObserver};

/// One JSON object per lifecycle event on stdout.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &ExecutionEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let mut value = json!({
            "v": 1,
            "event_type": event.event_type(),
            "ts": ts,
            "run_id": event.run_id(),
        });

        match event {
            ExecutionEvent::RunStart {
                mode, total_tasks, ..
            } => {
                value["metadata"] = json!({
                    "mode": mode,
                    "total_tasks": total_tasks,
                });
            }
            ExecutionEvent::Plan { layers, .. } => {
                let total_tasks: usize = layers.iter().map(|l| l.len()).sum();
                value["metadata"] = json!({
                    "layers": layers,
                    "total_tasks": total_tasks,
                });
            }
            ExecutionEvent::LayerStart {
                layer, task_ids, ..
            } => {
                value["metadata"] = json!({
                    "layer": layer,
                    "tasks": task_ids,
                });
            }
            ExecutionEvent::TaskStart { task_id, layer, .. } => {
                value["task_id"] = json!(task_id);
                value["metadata"] = json!({ "layer": layer });
            }
            ExecutionEvent::TaskComplete { layer, result, .. } => {
                value["task_id"] = json!(result.task_id);
                value["metadata"] = json!({
                    "layer": layer,
                    "success": result.success,
                    "duration_ms": result.execution_time_ms(),
                    "error": result.error,
                });
            }
            ExecutionEvent::LayerEnd { layer, .. } => {
                value["metadata"] = json!({ "layer": layer });
            }
            ExecutionEvent::Merge { strategy, .. } => {
                value["metadata"] = json!({ "strategy": strategy });
            }
            ExecutionEvent::RunEnd { result, .. } => {
                value["metadata"] = json!({
                    "total_tasks": result.total_tasks,
                    "successful": result.successful_tasks,
                    "failed": result.failed_tasks,
                    "duration_ms": result.total_execution_time.as_millis() as u64,
                });
            }
        }
        value
    }
}

impl ExecutionObserver for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn on_event(&self, event: &ExecutionEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
