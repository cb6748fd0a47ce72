use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecompositionError;
use crate::executor::types::Task;

static FENCED_JSON_REGEX: OnceLock<Regex> = OnceLock::new();

fn fenced_json_regex() -> &'static Regex {
    FENCED_JSON_REGEX.get_or_init(|| {
        Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("FENCED_JSON_REGEX is valid")
    })
}

/// Locate the JSON payload in a model response.
///
/// Prefers a ```` ```json ```` fenced block; otherwise takes the span from the
/// first `{` to the last `}`.
pub fn extract_json(response: &str) -> Result<&str, DecompositionError> {
    if let Some(body) = fenced_json_regex()
        .captures(response)
        .and_then(|caps| caps.get(1))
    {
        return Ok(body.as_str());
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&response[start..=end]),
        _ => Err(DecompositionError::NoJson),
    }
}

#[derive(Debug, Deserialize)]
struct RawSubtask {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    dependencies: Option<Vec<Value>>,
    #[serde(default)]
    priority: Option<f64>,
}

/// Parse a decomposition response into tasks, without applying constraints.
pub fn parse_subtasks(response: &str) -> Result<Vec<Task>, DecompositionError> {
    let json = extract_json(response)?;
    let parsed: Value = serde_json::from_str(json)?;

    let Some(items) = parsed.get("subtasks").and_then(Value::as_array) else {
        return Err(DecompositionError::MissingSubtasks);
    };
    if items.is_empty() {
        return Err(DecompositionError::EmptyPlan);
    }

    let mut tasks = Vec::with_capacity(items.len());
    let mut seen = HashSet::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let raw: RawSubtask = serde_json::from_value(item.clone())?;
        let task = raw.into_task(idx);
        // Filled-in ids (`task-N`) can collide with explicit ones.
        if !seen.insert(task.id.clone()) {
            return Err(DecompositionError::DuplicateId(task.id));
        }
        tasks.push(task);
    }
    Ok(tasks)
}

impl RawSubtask {
    fn into_task(self, idx: usize) -> Task {
        let id = self
            .id
            .as_ref()
            .and_then(id_text)
            .unwrap_or_else(|| format!("task-{}", idx + 1));
        let description = self.description.unwrap_or_default();
        let prompt = match self.prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => description.clone(),
        };
        let dependencies = self
            .dependencies
            .unwrap_or_default()
            .iter()
            .filter_map(id_text)
            .collect();

        Task {
            id,
            description,
            prompt,
            dependencies,
            priority: self.priority,
        }
    }
}

// Models sometimes emit numeric ids (`"id": 1`).
fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
