use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use subagent_core::api::{CompletionError, CompletionService, Message, ProviderConfig, Role};

use super::http::{build_http_client, classify, ensure_success, parse_json_response};
use super::sse::SseDecoder;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API backend.
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    url_messages: String,
}

impl AnthropicClient {
    pub fn new(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http_client(cfg.timeout_ms)?,
            api_key: cfg.api_key.trim().to_string(),
            model: cfg.resolved_model(),
            max_tokens: cfg.max_tokens,
            url_messages: format!("{}/v1/messages", cfg.resolved_base_url()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// System messages go in the top-level `system` field, the rest in order.
    fn request_body(&self, messages: &[Message], stream: bool) -> Value {
        let system = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": turns,
            "stream": stream,
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, CompletionError> {
        if !self.is_configured() {
            return Err(CompletionError::NotConfigured("anthropic".to_string()));
        }

        self.http
            .post(&self.url_messages)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|err| classify(err, &self.url_messages))
    }
}

/// Concatenated text blocks of a non-streaming response.
fn response_text(value: &Value) -> Result<String, CompletionError> {
    let blocks = value
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| CompletionError::Decode("response has no `content` array".to_string()))?;

    Ok(blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Text carried by one stream event, if any.
fn stream_delta(event: &Value) -> Result<Option<&str>, CompletionError> {
    match event.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => Ok(event
            .get("delta")
            .and_then(|d| d.get("text"))
            .and_then(Value::as_str)),
        Some("error") => {
            let message = event
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown stream error");
            Err(CompletionError::Stream(message.to_string()))
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn send_once(&self, messages: &[Message]) -> Result<String, CompletionError> {
        tracing::debug!(
            target: "subagent.completion",
            stage = "anthropic.send.in",
            url = %self.url_messages,
            model = %self.model,
            messages = messages.len()
        );
        let resp = self.post(&self.request_body(messages, false)).await?;
        let status = resp.status();
        let value = parse_json_response(resp).await?;
        let text = response_text(&value)?;
        tracing::debug!(
            target: "subagent.completion",
            stage = "anthropic.send.out",
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
            stage = "anthropic.stream.in",
            url = %self.url_messages,
            model = %self.model
        );
        let resp = ensure_success(self.post(&self.request_body(messages, true)).await?).await?;

        let mut decoder = SseDecoder::new();
        let mut text = String::new();
        let mut stream = resp.bytes_stream();

        let mut handle = |data: String, text: &mut String| -> Result<(), CompletionError> {
            let event: Value = match serde_json::from_str(&data) {
                Ok(v) => v,
                Err(_) => return Ok(()),
            };
            if let Some(delta) = stream_delta(&event)? {
                if !delta.is_empty() {
                    on_chunk(delta);
                    text.push_str(delta);
                }
            }
            Ok(())
        };

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| classify(err, &self.url_messages))?;
            for data in decoder.push(&chunk) {
                handle(data, &mut text)?;
            }
        }
        if let Some(data) = decoder.finish() {
            handle(data, &mut text)?;
        }

        tracing::debug!(
            target: "subagent.completion",
            stage = "anthropic.stream.out",
            text_len = text.len()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;
    use subagent_core::api::ProviderKind;

    fn client_for(url: String, key: &str) -> AnthropicClient {
        let mut cfg = ProviderConfig::for_kind(ProviderKind::Anthropic);
        cfg.base_url = Some(url);
        cfg.api_key = key.to_string();
        cfg.timeout_ms = 2_000;
        AnthropicClient::new(&cfg).unwrap()
    }

    #[test]
    fn system_messages_move_to_top_level() {
        let client = client_for("http://localhost".into(), "k");
        let body = client.request_body(
            &[Message::system("rules"), Message::user("hi")],
            false,
        );
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
    }

    #[tokio::test]
    async fn send_once_joins_text_blocks() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(json!({ "stream": false })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"one"},{"type":"tool_use","id":"x"},{"type":"text","text":"two"}]}"#)
            .create_async()
            .await;

        let client = client_for(server.url(), "sk-ant");
        let text = client.send_once(&[Message::user("hi")]).await.unwrap();
        assert_eq!(text, "one\ntwo");
    }

    #[tokio::test]
    async fn non_success_status_carries_body_preview() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = client_for(server.url(), "sk-ant");
        let err = client.send_once(&[Message::user("hi")]).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Status {
                status: 529,
                body: "overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn streaming_emits_text_deltas() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        let _m = server
            .mock("POST", "/v1/messages")
            .match_body(Matcher::PartialJson(json!({ "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(server.url(), "sk-ant");
        let mut chunks = Vec::new();
        let text = client
            .send_streaming(&[Message::user("hi")], &mut |c: &str| chunks.push(c.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(chunks, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = client_for("http://127.0.0.1:9".into(), "  ");
        assert!(!client.is_configured());
        let err = client.send_once(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, CompletionError::NotConfigured(_)));
    }
}
