//! Scripted completion backend for unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionService, Message};
use crate::error::CompletionError;

pub(crate) struct ScriptedCompletion {
    default: Result<String, CompletionError>,
    /// (needle, reply): the first needle found in the last message wins.
    rules: Vec<(String, Result<String, CompletionError>)>,
    configured: bool,
    delay: Duration,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedCompletion {
    pub(crate) fn always(reply: impl Into<String>) -> Self {
        Self::with_default(Ok(reply.into()))
    }

    pub(crate) fn failing(err: CompletionError) -> Self {
        Self::with_default(Err(err))
    }

    fn with_default(default: Result<String, CompletionError>) -> Self {
        Self {
            default,
            rules: Vec::new(),
            configured: true,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on(mut self, needle: &str, reply: Result<&str, CompletionError>) -> Self {
        self.rules
            .push((needle.to_string(), reply.map(str::to_string)));
        self
    }

    pub(crate) fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_once(&self, messages: &[Message]) -> Result<String, CompletionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        self.rules
            .iter()
            .find(|(needle, _)| last.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}
