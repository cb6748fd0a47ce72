//! Completion service contract.
//!
//! The engine never talks to a text-generation backend directly; it goes
//! through [`CompletionService`]. Concrete HTTP backends live in the
//! `subagent-plugins` crate.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::executor::run_bounded;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text-completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Backend name, used in logs.
    fn name(&self) -> &str;

    /// Whether the backend has what it needs (credentials, endpoint) to serve
    /// requests. The executor refuses to start when this is false.
    fn is_configured(&self) -> bool {
        true
    }

    /// Send one request and wait for the full response text.
    async fn send_once(&self, messages: &[Message]) -> Result<String, CompletionError>;

    /// Send one request, invoking `on_chunk` for each piece of text as it
    /// arrives. Returns the accumulated text.
    ///
    /// Backends without native streaming deliver the whole response as a
    /// single chunk.
    async fn send_streaming(
        &self,
        messages: &[Message],
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<String, CompletionError> {
        let text = self.send_once(messages).await?;
        if !text.is_empty() {
            on_chunk(&text);
        }
        Ok(text)
    }

    /// Run several independent requests with at most `concurrency_limit` in
    /// flight. The output is positionally aligned with `requests`; a failed
    /// request only affects its own slot.
    async fn send_batch(
        &self,
        requests: Vec<Vec<Message>>,
        concurrency_limit: usize,
    ) -> Vec<Result<String, CompletionError>> {
        run_bounded(requests, concurrency_limit, |_, messages| async move {
            self.send_once(&messages).await
        })
        .await
    }
}
