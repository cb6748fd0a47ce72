use std::time::Duration;

use serde_json::Value;
use subagent_core::api::CompletionError;

pub(crate) const BODY_PREVIEW_LIMIT: usize = 512;

pub(crate) fn build_http_client(timeout_ms: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()?)
}

/// Map a transport failure onto the completion error taxonomy.
pub(crate) fn classify(err: reqwest::Error, url: &str) -> CompletionError {
    if err.is_timeout() {
        CompletionError::Timeout
    } else if err.is_connect() {
        CompletionError::Connect(format!("{} ({})", err, url))
    } else if err.is_decode() {
        CompletionError::Decode(err.to_string())
    } else if err.is_body() {
        CompletionError::Stream(err.to_string())
    } else {
        CompletionError::Request(format!("{} ({})", err, url))
    }
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out = String::new();
    let mut truncated = false;
    for (idx, ch) in trimmed.chars().enumerate() {
        if idx >= BODY_PREVIEW_LIMIT {
            truncated = true;
            break;
        }
        out.push(ch);
    }

    if truncated {
        out.push_str("...");
    }

    out
}

/// Pass a 2xx response through; otherwise read its body into a status error.
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, CompletionError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let body = resp.text().await.map_err(|err| classify(err, &url))?;
    Err(CompletionError::Status {
        status: status.as_u16(),
        body: preview_body(&body),
    })
}

pub(crate) async fn parse_json_response(resp: reqwest::Response) -> Result<Value, CompletionError> {
    let resp = ensure_success(resp).await?;
    let url = resp.url().to_string();
    let body = resp.text().await.map_err(|err| classify(err, &url))?;

    serde_json::from_str::<Value>(&body).map_err(|err| {
        CompletionError::Decode(format!(
            "failed to decode response body: {} | body={}",
            err,
            preview_body(&body)
        ))
    })
}
