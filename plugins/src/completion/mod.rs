//! HTTP completion backends.

pub mod anthropic;
mod http;
pub mod openai;
mod sse;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiCompatibleClient;
