use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a task list is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Every task at once (bounded by the concurrency ceiling), dependencies ignored.
    Parallel,
    /// One task at a time, in list order.
    Sequential,
    /// Dependency layers, each layer run concurrently.
    #[default]
    Hybrid,
}

impl ExecutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!(
                "unknown execution mode '{other}' (expected parallel, sequential or hybrid)"
            )),
        }
    }
}

/// How per-task outputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    Concatenate,
    #[default]
    SmartSummary,
    CustomStructure,
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concatenate => "concatenate",
            Self::SmartSummary => "smart-summary",
            Self::CustomStructure => "custom-structure",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "concatenate" => Ok(Self::Concatenate),
            "smart-summary" | "smartsummary" => Ok(Self::SmartSummary),
            "custom-structure" | "customstructure" => Ok(Self::CustomStructure),
            other => Err(format!(
                "unknown merge strategy '{other}' (expected concatenate, smart-summary or custom-structure)"
            )),
        }
    }
}

pub const DEFAULT_MAX_CONCURRENCY: usize = 5;
pub const DEFAULT_MAX_SUB_TASKS: usize = 5;

/// Executor settings (`[executor]` in the config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of in-flight completion requests.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub mode: ExecutionMode,

    /// Strategy used to build `AggregatedResult::merged_content`.
    #[serde(default)]
    pub merge_strategy: MergeStrategy,

    /// Show indicatif progress bars while tasks run.
    #[serde(default)]
    pub progress_bar: bool,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            mode: ExecutionMode::default(),
            merge_strategy: MergeStrategy::default(),
            progress_bar: false,
        }
    }
}

/// Limits applied to a decomposition (`[decomposition]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionConstraints {
    #[serde(default = "default_max_sub_tasks")]
    pub max_sub_tasks: usize,

    #[serde(default = "default_allow_dependencies")]
    pub allow_dependencies: bool,

    /// Accepted for compatibility; plans are always one level deep.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

fn default_max_sub_tasks() -> usize {
    DEFAULT_MAX_SUB_TASKS
}

fn default_allow_dependencies() -> bool {
    true
}

impl Default for DecompositionConstraints {
    fn default() -> Self {
        Self {
            max_sub_tasks: default_max_sub_tasks(),
            allow_dependencies: default_allow_dependencies(),
            max_depth: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_and_display() {
        for mode in [
            ExecutionMode::Parallel,
            ExecutionMode::Sequential,
            ExecutionMode::Hybrid,
        ] {
            assert_eq!(mode.as_str().parse::<ExecutionMode>(), Ok(mode));
        }
        assert!("layered".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn merge_strategy_accepts_common_spellings() {
        assert_eq!(
            "smart_summary".parse::<MergeStrategy>(),
            Ok(MergeStrategy::SmartSummary)
        );
        assert_eq!(
            "CustomStructure".parse::<MergeStrategy>(),
            Ok(MergeStrategy::CustomStructure)
        );
    }

    #[test]
    fn executor_config_defaults_from_empty_toml() {
        let cfg: ExecutorConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.max_concurrency, 5);
        assert_eq!(cfg.mode, ExecutionMode::Hybrid);
        assert_eq!(cfg.merge_strategy, MergeStrategy::SmartSummary);
        assert!(!cfg.progress_bar);
    }

    #[test]
    fn merge_strategy_uses_kebab_case_in_toml() {
        let cfg: ExecutorConfig = toml::from_str("merge_strategy = \"custom-structure\"").unwrap();
        assert_eq!(cfg.merge_strategy, MergeStrategy::CustomStructure);
    }
}
