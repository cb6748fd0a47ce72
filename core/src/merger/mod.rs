//! Result merging
//!
//! Combines the ordered per-task results of one run into a single document.
//! Merging never fails: the smart strategy falls back to concatenation when
//! its extra completion request does not work out.

use std::sync::Arc;

use serde_json::json;

use crate::completion::{CompletionService, Message};
use crate::error::CompletionError;
use crate::executor::types::{MergeStrategy, TaskResult};

pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const SUMMARY_SYSTEM_PROMPT: &str = r#"You are an expert at integrating results. Combine the outputs of several subtasks into one clear, well-organised report.

Integration rules:
1. Extract the key information and main points of every subtask.
2. Keep the structure logical, with clear sections.
3. Keep useful structure from the subtask outputs (lists, tables, code).
4. If any subtask failed, say so explicitly and name it."#;

pub struct ResultMerger {
    service: Arc<dyn CompletionService>,
}

impl ResultMerger {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    pub async fn merge(&self, results: &[TaskResult], strategy: MergeStrategy) -> String {
        match strategy {
            MergeStrategy::Concatenate => concatenate(results),
            MergeStrategy::SmartSummary => self.smart_summary(results).await,
            MergeStrategy::CustomStructure => custom_structure(results),
        }
    }

    async fn smart_summary(&self, results: &[TaskResult]) -> String {
        match self.try_smart_summary(results).await {
            Ok(summary) => summary,
            Err(err) => {
                tracing::warn!(
                    target: "subagent.merger",
                    error = %err,
                    kind = err.kind(),
                    "smart summary failed, falling back to concatenation"
                );
                concatenate(results)
            }
        }
    }

    /// Ask the completion service for a synthesized report.
    pub async fn try_smart_summary(&self, results: &[TaskResult]) -> Result<String, CompletionError> {
        if !self.service.is_configured() {
            return Err(CompletionError::NotConfigured(self.service.name().to_string()));
        }

        let user = format!(
            "Integrate the results of the following subtasks:\n\n```\n{}\n```\n\nWrite the combined report:",
            summary_block(results)
        );
        let messages = [Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(user)];

        let summary = self.service.send_once(&messages).await?;
        if summary.trim().is_empty() {
            return Err(CompletionError::Decode("empty summary".to_string()));
        }
        Ok(summary)
    }
}

/// Labelled sections in input order, failures annotated with their error.
pub fn concatenate(results: &[TaskResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(idx, result)| {
            let body = if result.success {
                result.content.clone()
            } else {
                format!("Failed: {}", failure_reason(result))
            };
            format!("## Subtask {}: {}\n\n{}", idx + 1, result.task_id, body)
        })
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Machine-readable summary plus every result, no synthesis.
pub fn custom_structure(results: &[TaskResult]) -> String {
    let successful = results.iter().filter(|r| r.success).count();
    let structure = json!({
        "summary": {
            "total": results.len(),
            "successful": successful,
            "failed": results.len() - successful,
        },
        "results": results
            .iter()
            .enumerate()
            .map(|(idx, r)| json!({
                "id": r.task_id,
                "index": idx + 1,
                "success": r.success,
                "content": if r.success { Some(r.content.as_str()) } else { None },
                "error": r.error,
                "executionTime": r.execution_time_ms(),
            }))
            .collect::<Vec<_>>(),
    });

    serde_json::to_string_pretty(&structure).unwrap_or_else(|_| "{}".into())
}

fn summary_block(results: &[TaskResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            if r.success {
                format!("[Subtask {} ({})]: {}", idx + 1, r.task_id, r.content)
            } else {
                format!(
                    "[Subtask {} ({})]: FAILED: {}",
                    idx + 1,
                    r.task_id,
                    failure_reason(r)
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn failure_reason(result: &TaskResult) -> &str {
    result.error.as_deref().unwrap_or("unknown error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::ScriptedCompletion;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn sample() -> Vec<TaskResult> {
        vec![
            TaskResult::succeeded("t1", "first output".into(), Duration::from_millis(12)),
            TaskResult::failed("t2", "HTTP 500".into(), Duration::from_millis(4)),
            TaskResult::succeeded("t3", "third output".into(), Duration::ZERO),
        ]
    }

    #[test]
    fn concatenate_labels_sections_in_order() {
        let out = concatenate(&sample());
        let sections: Vec<&str> = out.split(SECTION_SEPARATOR).collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0], "## Subtask 1: t1\n\nfirst output");
        assert_eq!(sections[1], "## Subtask 2: t2\n\nFailed: HTTP 500");
        assert_eq!(sections[2], "## Subtask 3: t3\n\nthird output");
    }

    #[test]
    fn concatenate_is_idempotent() {
        let results = sample();
        assert_eq!(concatenate(&results), concatenate(&results));
        assert_eq!(concatenate(&[]), "");
    }

    #[test]
    fn custom_structure_reports_counts_and_nulls() {
        let out = custom_structure(&sample());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["summary"]["total"], 3);
        assert_eq!(value["summary"]["successful"], 2);
        assert_eq!(value["summary"]["failed"], 1);

        let second = &value["results"][1];
        assert_eq!(second["id"], "t2");
        assert_eq!(second["index"], 2);
        assert!(second["content"].is_null());
        assert_eq!(second["error"], "HTTP 500");
        assert_eq!(value["results"][0]["executionTime"], 12);
        assert!(value["results"][0]["error"].is_null());
    }

    #[test]
    fn smart_summary_uses_backend_reply() {
        let svc = Arc::new(ScriptedCompletion::always("combined report"));
        let merger = ResultMerger::new(svc.clone());

        let out = tokio_test::block_on(merger.merge(&sample(), MergeStrategy::SmartSummary));
        assert_eq!(out, "combined report");

        let calls = svc.calls();
        assert_eq!(calls.len(), 1);
        let block = &calls[0][1].content;
        assert!(block.contains("first output"));
        assert!(block.contains("FAILED: HTTP 500"));
    }

    #[test]
    fn smart_summary_failure_equals_concatenate() {
        let svc = Arc::new(ScriptedCompletion::failing(CompletionError::Timeout));
        let merger = ResultMerger::new(svc);
        let results = sample();

        let out = tokio_test::block_on(merger.merge(&results, MergeStrategy::SmartSummary));
        assert_eq!(out, concatenate(&results));
    }

    #[test]
    fn smart_summary_without_backend_equals_concatenate() {
        let svc = Arc::new(ScriptedCompletion::always("unused").unconfigured());
        let merger = ResultMerger::new(svc.clone());
        let results = sample();

        let out = tokio_test::block_on(merger.merge(&results, MergeStrategy::SmartSummary));
        assert_eq!(out, concatenate(&results));
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn blank_summary_is_treated_as_failure() {
        let svc = Arc::new(ScriptedCompletion::always("   \n"));
        let merger = ResultMerger::new(svc);
        let results = sample();

        let out = tokio_test::block_on(merger.merge(&results, MergeStrategy::SmartSummary));
        assert_eq!(out, concatenate(&results));
    }
}
