use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use subagent_core::api::{CompletionError, CompletionService, Message, ProviderConfig};

use super::http::{build_http_client, classify, ensure_success, parse_json_response};
use super::sse::SseDecoder;

const DONE_SENTINEL: &str = "[DONE]";

/// Backend for OpenAI-style `chat/completions` endpoints (OpenAI, Zhipu,
/// Qwen, DeepSeek, Moonshot).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    provider: &'static str,
    api_key: String,
    model: String,
    url_chat: String,
}

impl OpenAiCompatibleClient {
    pub fn new(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http_client(cfg.timeout_ms)?,
            provider: cfg.kind.as_str(),
            api_key: cfg.api_key.trim().to_string(),
            model: cfg.resolved_model(),
            url_chat: format!("{}/chat/completions", cfg.resolved_base_url()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[Message], stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, CompletionError> {
        if !self.is_configured() {
            return Err(CompletionError::NotConfigured(self.provider.to_string()));
        }

        self.http
            .post(&self.url_chat)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| classify(err, &self.url_chat))
    }
}

fn response_text(value: &Value) -> Result<String, CompletionError> {
    value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            CompletionError::Decode("response has no choices[0].message.content".to_string())
        })
}

#[async_trait]
impl CompletionService for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        self.provider
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn send_once(&self, messages: &[Message]) -> Result<String, CompletionError> {
        tracing::debug!(
            target: "subagent.completion",
            stage = "openai.send.in",
            provider = self.provider,
            url = %self.url_chat,
            model = %self.model,
            messages = messages.len()
        );
        let resp = self.post(&self.request_body(messages, false)).await?;
        let status = resp.status();
        let value = parse_json_response(resp).await?;
        let text = response_text(&value)?;
        tracing::debug!(
            target: "subagent.completion",
            stage = "openai.send.out",
            provider = self.provider,
            status = %status,
            text_len = text.len()
        );
        Ok(text)
    }

    async fn send_streaming(
        &self,
        messages: &[Message],
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<String, CompletionError> {
        tracing::debug!(
            target: "subagent.completion",
            stage = "openai.stream.in",
            provider = self.provider,
            url = %self.url_chat,
            model = %self.model
        );
        let resp = ensure_success(self.post(&self.request_body(messages, true)).await?).await?;

        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        let mut stream = resp.bytes_stream();

        // Returns false once the terminator has been seen.
        let mut handle = |data: String, text: &mut String| -> bool {
            if data.trim() == DONE_SENTINEL {
                return false;
            }
            if let Ok(event) = serde_json::from_str::<Value>(&data) {
                if let Some(delta) = event
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                    .filter(|d| !d.is_empty())
                {
                    on_chunk(delta);
                    text.push_str(delta);
                }
            }
            true
        };

        let mut open = true;
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| classify(err, &self.url_chat))?;
            for data in decoder.push(&chunk) {
                open = handle(data, &mut text);
                if !open {
                    break 'read;
                }
            }
        }
        if open {
            if let Some(data) = decoder.finish() {
                handle(data, &mut text);
            }
        }

        tracing::debug!(
            target: "subagent.completion",
            stage = "openai.stream.out",
            provider = self.provider,
            text_len = text.len()
        );
        Ok(text)
    }
}
