use std::sync::Arc;

use anyhow::Result;

use subagent_core::api::{CompletionService, ExecutionObserver, ProviderConfig, ProviderKind};

use crate::completion::{AnthropicClient, OpenAiCompatibleClient};
use crate::executor::{JsonlRendererPlugin, TextRendererPlugin};

/// Build the HTTP backend for the configured provider.
///
/// A missing API key still yields a client; it reports
/// `is_configured() == false` and the executor refuses to run with it.
pub fn build_completion_service(cfg: &ProviderConfig) -> Result<Arc<dyn CompletionService>> {
    let service: Arc<dyn CompletionService> = match cfg.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(cfg)?),
        ProviderKind::OpenAi
        | ProviderKind::Zhipu
        | ProviderKind::Qwen
        | ProviderKind::DeepSeek
        | ProviderKind::Moonshot => Arc::new(OpenAiCompatibleClient::new(cfg)?),
    };

    tracing::debug!(
        target: "subagent.completion",
        provider = %cfg.kind,
        model = %cfg.resolved_model(),
        base_url = %cfg.resolved_base_url(),
        configured = service.is_configured(),
        "built completion service"
    );
    Ok(service)
}

/// Event renderer for an output format; `None` when the format renders
/// nothing while the run is in progress.
pub fn build_observer(format: &str, verbose: bool) -> Option<Arc<dyn ExecutionObserver>> {
    match format {
        "jsonl" => Some(Arc::new(JsonlRendererPlugin::new(false))),
        "text" if verbose => Some(Arc::new(TextRendererPlugin::new(false))),
        _ => None,
    }
}
