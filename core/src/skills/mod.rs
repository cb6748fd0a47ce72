//! Skills: named prompt templates run as a single completion.
//!
//! Three skills are built in (`summarize`, `translate`, `code-analyze`).
//! Custom skills come from `[[skills]]` config tables and are sent as one
//! user message rendered from their template.

mod predefined;
mod template;

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::completion::{CompletionService, Message};
use crate::config::SkillConfig;
use crate::error::{CompletionError, SkillError};
use crate::executor::run_bounded;

pub use predefined::{predefined_skills, CODE_ANALYZE, SUMMARIZE, TRANSLATE};
pub use template::{placeholders, render_template};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Predefined,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub category: SkillCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt_template: String,
}

impl SkillDefinition {
    pub fn from_config(cfg: &SkillConfig) -> Result<Self, SkillError> {
        let id = cfg.id.trim();
        let invalid = |reason: &str| SkillError::InvalidDefinition {
            id: cfg.id.clone(),
            reason: reason.to_string(),
        };
        if id.is_empty() {
            return Err(invalid("empty id"));
        }
        if cfg.prompt_template.trim().is_empty() {
            return Err(invalid("empty prompt_template"));
        }

        Ok(Self {
            id: id.to_string(),
            name: if cfg.name.trim().is_empty() {
                id.to_string()
            } else {
                cfg.name.clone()
            },
            description: cfg.description.clone(),
            icon: cfg.icon.clone(),
            category: SkillCategory::Custom,
            system_prompt: None,
            prompt_template: cfg.prompt_template.clone(),
        })
    }

    /// Messages sent for `ctx`: optional system prompt, then the rendered template.
    pub fn messages(&self, ctx: &SkillContext) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(render_template(
            &self.prompt_template,
            &ctx.input,
            ctx.selection.as_deref(),
            &ctx.metadata,
        )));
        messages
    }
}

/// Input of one skill invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillContext {
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl SkillContext {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillResult {
    pub skill_id: String,
    pub success: bool,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Built-in skills followed by custom ones, in registration order.
#[derive(Debug, Clone)]
pub struct SkillRegistry {
    skills: Vec<SkillDefinition>,
    index: HashMap<String, usize>,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillRegistry {
    /// Registry holding the built-in skills only.
    pub fn new() -> Self {
        let skills = predefined_skills();
        let index = skills
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id.clone(), idx))
            .collect();
        Self { skills, index }
    }

    /// Built-in skills plus every `[[skills]]` entry. Fails on the first
    /// invalid or conflicting entry.
    pub fn with_custom(configs: &[SkillConfig]) -> Result<Self, SkillError> {
        let mut registry = Self::new();
        for cfg in configs {
            registry.add_custom(cfg)?;
        }
        Ok(registry)
    }

    pub fn add_custom(&mut self, cfg: &SkillConfig) -> Result<(), SkillError> {
        self.register(SkillDefinition::from_config(cfg)?)
    }

    pub fn register(&mut self, skill: SkillDefinition) -> Result<(), SkillError> {
        if self.index.contains_key(&skill.id) {
            return Err(SkillError::DuplicateId(skill.id));
        }
        self.index.insert(skill.id.clone(), self.skills.len());
        self.skills.push(skill);
        Ok(())
    }

    /// Remove a custom skill. Built-in skills cannot be removed.
    pub fn remove_custom(&mut self, id: &str) -> bool {
        let removable = self
            .get(id)
            .is_some_and(|s| s.category == SkillCategory::Custom);
        if !removable {
            return false;
        }

        self.skills.retain(|s| s.id != id);
        self.index = self
            .skills
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id.clone(), idx))
            .collect();
        true
    }

    pub fn get(&self, id: &str) -> Option<&SkillDefinition> {
        self.index.get(id).map(|&idx| &self.skills[idx])
    }

    pub fn list(&self) -> &[SkillDefinition] {
        &self.skills
    }

    /// Run one skill. Completion failures are reported in the result.
    pub async fn execute(
        &self,
        service: &dyn CompletionService,
        id: &str,
        ctx: &SkillContext,
    ) -> Result<SkillResult, SkillError> {
        let skill = self
            .get(id)
            .ok_or_else(|| SkillError::NotFound(id.to_string()))?;
        Ok(run_skill(service, skill, ctx).await)
    }

    /// Run several skills on the same input with at most `max_concurrency`
    /// in flight. Every id is resolved before any request is sent; results
    /// follow the order of `ids`.
    pub async fn execute_parallel(
        &self,
        service: &dyn CompletionService,
        ids: &[String],
        ctx: &SkillContext,
        max_concurrency: usize,
    ) -> Result<Vec<SkillResult>, SkillError> {
        let skills = ids
            .iter()
            .map(|id| self.get(id).ok_or_else(|| SkillError::NotFound(id.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(run_bounded(skills, max_concurrency, |_, skill| run_skill(service, skill, ctx)).await)
    }
}

async fn run_skill(
    service: &dyn CompletionService,
    skill: &SkillDefinition,
    ctx: &SkillContext,
) -> SkillResult {
    let start = Instant::now();
    tracing::debug!(
        target: "subagent.skills",
        skill = %skill.id,
        category = ?skill.category,
        input_len = ctx.input.len(),
        "running skill"
    );

    let outcome = if service.is_configured() {
        service.send_once(&skill.messages(ctx)).await
    } else {
        Err(CompletionError::NotConfigured(service.name().to_string()))
    };
    let elapsed = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(content) => SkillResult {
            skill_id: skill.id.clone(),
            success: true,
            content,
            error: None,
            execution_time_ms: elapsed,
        },
        Err(err) => {
            tracing::warn!(
                target: "subagent.skills",
                skill = %skill.id,
                error = %err,
                "skill failed"
            );
            SkillResult {
                skill_id: skill.id.clone(),
                success: false,
                content: String::new(),
                error: Some(err.to_string()),
                execution_time_ms: elapsed,
            }
        }
    }
}
