use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::executor::types::{DecompositionConstraints, ExecutorConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub decomposition: DecompositionConstraints,

    /// Custom prompt-template skills (`[[skills]]` tables).
    #[serde(default)]
    pub skills: Vec<SkillConfig>,
}

/// A user-defined skill: a prompt template sent as one user message.
///
/// Placeholders: `{{input}}`, `{{selection}}` (falls back to the input) and
/// `{{<key>}}` for any metadata entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub prompt_template: String,

    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "subagent.executor=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// Supported text-generation providers.
///
/// Anthropic speaks the Messages API; every other provider exposes an
/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
    Zhipu,
    Qwen,
    DeepSeek,
    Moonshot,
}

/// Static defaults of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPreset {
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub default_model: &'static str,
    pub models: &'static [&'static str],
    /// Environment variable the API key is read from when none is configured.
    pub api_key_env: &'static str,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Anthropic,
        ProviderKind::OpenAi,
        ProviderKind::Zhipu,
        ProviderKind::Qwen,
        ProviderKind::DeepSeek,
        ProviderKind::Moonshot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Zhipu => "zhipu",
            Self::Qwen => "qwen",
            Self::DeepSeek => "deepseek",
            Self::Moonshot => "moonshot",
        }
    }

    pub fn is_openai_compatible(self) -> bool {
        !matches!(self, Self::Anthropic)
    }

    pub fn preset(self) -> ProviderPreset {
        match self {
            Self::Anthropic => ProviderPreset {
                display_name: "Anthropic (Claude)",
                base_url: "https://api.anthropic.com",
                default_model: "claude-3-5-sonnet-20241022",
                models: &[
                    "claude-3-5-sonnet-20241022",
                    "claude-3-opus-20240229",
                    "claude-3-sonnet-20240229",
                    "claude-3-haiku-20240307",
                ],
                api_key_env: "ANTHROPIC_API_KEY",
            },
            Self::OpenAi => ProviderPreset {
                display_name: "OpenAI (GPT)",
                base_url: "https://api.openai.com/v1",
                default_model: "gpt-4o-mini",
                models: &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"],
                api_key_env: "OPENAI_API_KEY",
            },
            Self::Zhipu => ProviderPreset {
                display_name: "Zhipu AI (GLM)",
                base_url: "https://open.bigmodel.cn/api/paas/v4",
                default_model: "glm-4-flash",
                models: &["glm-4-plus", "glm-4-air", "glm-4-flash", "glm-4"],
                api_key_env: "ZHIPUAI_API_KEY",
            },
            Self::Qwen => ProviderPreset {
                display_name: "Alibaba Cloud (Qwen)",
                base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
                default_model: "qwen-plus",
                models: &["qwen-max", "qwen-plus", "qwen-turbo", "qwen-long"],
                api_key_env: "DASHSCOPE_API_KEY",
            },
            Self::DeepSeek => ProviderPreset {
                display_name: "DeepSeek",
                base_url: "https://api.deepseek.com",
                default_model: "deepseek-chat",
                models: &["deepseek-chat", "deepseek-coder"],
                api_key_env: "DEEPSEEK_API_KEY",
            },
            Self::Moonshot => ProviderPreset {
                display_name: "Moonshot (Kimi)",
                base_url: "https://api.moonshot.cn/v1",
                default_model: "moonshot-v1-8k",
                models: &["moonshot-v1-8k", "moonshot-v1-32k", "moonshot-v1-128k"],
                api_key_env: "MOONSHOT_API_KEY",
            },
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown provider: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    /// Overrides the preset endpoint when set.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Overrides the preset default model when set.
    #[serde(default)]
    pub model: Option<String>,

    /// Empty means "read from the preset's environment variable".
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: None,
            model: None,
            api_key: String::new(),
            timeout_ms: default_timeout_ms(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ProviderConfig {
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Endpoint without a trailing slash.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.kind.preset().base_url)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolved_model(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.kind.preset().default_model)
            .to_string()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.provider.kind, ProviderKind::Anthropic);
        assert_eq!(cfg.provider.timeout_ms, 120_000);
        assert_eq!(cfg.executor.max_concurrency, 5);
        assert_eq!(cfg.decomposition.max_sub_tasks, 5);
        assert!(cfg.logging.console);
        assert!(!cfg.logging.file);
    }

    #[test]
    fn skills_tables_parse() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [[skills]]
            id = "haiku"
            name = "Haiku"
            prompt_template = "Write a haiku about {{input}}"

            [[skills]]
            id = "tone"
            name = "Rewrite tone"
            description = "Rewrite text in a given tone"
            prompt_template = "Rewrite in a {{tone}} tone:\n{{selection}}"
            icon = "T"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.skills.len(), 2);
        assert_eq!(cfg.skills[0].id, "haiku");
        assert_eq!(cfg.skills[0].description, "");
        assert_eq!(cfg.skills[1].icon.as_deref(), Some("T"));
        assert!(AppConfig::default().skills.is_empty());
    }

    #[test]
    fn sections_parse_from_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [provider]
            kind = "deepseek"
            api_key = "sk-test"

            [executor]
            max_concurrency = 2
            mode = "sequential"
            merge_strategy = "custom-structure"

            [decomposition]
            max_sub_tasks = 3
            allow_dependencies = false
            "#,
        )
        .unwrap();

        assert_eq!(cfg.provider.kind, ProviderKind::DeepSeek);
        assert_eq!(cfg.provider.resolved_model(), "deepseek-chat");
        assert_eq!(cfg.executor.max_concurrency, 2);
        assert_eq!(cfg.executor.mode.as_str(), "sequential");
        assert_eq!(cfg.executor.merge_strategy.as_str(), "custom-structure");
        assert_eq!(cfg.decomposition.max_sub_tasks, 3);
        assert!(!cfg.decomposition.allow_dependencies);
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let mut provider = ProviderConfig::for_kind(ProviderKind::OpenAi);
        assert_eq!(provider.resolved_base_url(), "https://api.openai.com/v1");

        provider.base_url = Some("http://localhost:8080/v1/".into());
        assert_eq!(provider.resolved_base_url(), "http://localhost:8080/v1");

        provider.base_url = Some("   ".into());
        assert_eq!(provider.resolved_base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn provider_kind_round_trips_names() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>(), Ok(kind));
        }
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert!("bard".parse::<ProviderKind>().is_err());
        assert!(!ProviderKind::Anthropic.is_openai_compatible());
        assert!(ProviderKind::Qwen.is_openai_compatible());
    }
}
