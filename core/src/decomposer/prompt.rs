//! Prompt text for the decomposition request and the fallback plan.

use std::fmt::Write;

pub fn system_prompt(max_sub_tasks: usize) -> String {
    format!(
        r#"You are an expert at breaking complex tasks into smaller subtasks that can be carried out independently.

Decomposition rules:
1. Every subtask must have a clear goal and concrete, executable instructions.
2. Subtasks should be as independent of each other as possible.
3. If a subtask needs the result of another one, list the other subtask's id in its "dependencies".
4. Produce at most {max_sub_tasks} subtasks.

Output format (JSON):
```json
{{
  "subtasks": [
    {{
      "id": "task-1",
      "description": "short description of the subtask",
      "prompt": "detailed instructions for carrying out the subtask",
      "dependencies": []
    }}
  ]
}}
```"#
    )
}

pub fn user_prompt(description: &str, context: Option<&str>) -> String {
    let mut out = String::with_capacity(description.len() + 128);
    out.push_str("Break the following task into subtasks:\n\n");
    let _ = writeln!(out, "Main task: {}", description);
    if let Some(ctx) = non_empty(context) {
        let _ = writeln!(out, "Context: {}", ctx);
    }
    out.push_str("\nRespond with the decomposition in the JSON format above:");
    out
}

/// Prompt of the single task used when decomposition fails. Embeds the
/// description and context verbatim.
pub fn fallback_prompt(description: &str, context: Option<&str>) -> String {
    match non_empty(context) {
        Some(ctx) => format!(
            "Please complete the following task: {}\n\nContext: {}",
            description, ctx
        ),
        None => format!("Please complete the following task: {}", description),
    }
}

fn non_empty(context: Option<&str>) -> Option<&str> {
    context.filter(|c| !c.trim().is_empty())
}
