use std::sync::Mutex;

use async_trait::async_trait;
use subagent_core::api::{CompletionError, CompletionService, Message, Role};

/// Completion backend driven by substring rules on the last message.
pub struct MockCompletion {
    rules: Vec<(String, Result<String, CompletionError>)>,
    fallback: String,
    configured: bool,
    log: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletion {
    pub fn new(fallback: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.to_string(),
            configured: true,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, needle: &str, text: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(text.to_string())));
        self
    }

    pub fn fail(mut self, needle: &str, err: CompletionError) -> Self {
        self.rules.push((needle.to_string(), Err(err)));
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.log.lock().unwrap().clone()
    }

    /// User prompts of requests that had no system message (task executions).
    pub fn task_prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|msgs| msgs.iter().all(|m| m.role != Role::System))
            .filter_map(|msgs| msgs.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_once(&self, messages: &[Message]) -> Result<String, CompletionError> {
        self.log.lock().unwrap().push(messages.to_vec());
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        for (needle, reply) in &self.rules {
            if last.contains(needle.as_str()) {
                return reply.clone();
            }
        }
        Ok(self.fallback.clone())
    }
}

pub const BLOG_PLAN: &str = r#"{"subtasks":[{"id":"t1","description":"research","prompt":"research the topic"},{"id":"t2","description":"write","prompt":"write the outline","dependencies":["t1"]}]}"#;
