use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use subagent_core::api::{ExecutionMode, MergeStrategy};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Parallel,
    Sequential,
    Hybrid,
}

impl From<ModeArg> for ExecutionMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Parallel => ExecutionMode::Parallel,
            ModeArg::Sequential => ExecutionMode::Sequential,
            ModeArg::Hybrid => ExecutionMode::Hybrid,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeArg {
    Concatenate,
    SmartSummary,
    CustomStructure,
}

impl From<MergeArg> for MergeStrategy {
    fn from(value: MergeArg) -> Self {
        match value {
            MergeArg::Concatenate => MergeStrategy::Concatenate,
            MergeArg::SmartSummary => MergeStrategy::SmartSummary,
            MergeArg::CustomStructure => MergeStrategy::CustomStructure,
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Merged content only
    #[default]
    Text,
    /// The full aggregate, pretty-printed
    Json,
    /// Lifecycle events, then the aggregate, one JSON object per line
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "subagent", version, about = "Decompose a task, run the subtasks, merge the results")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: $SUBAGENT_CONFIG, ~/.subagent/config.toml, ./subagent.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Provider: anthropic, openai, zhipu, qwen, deepseek, moonshot
    #[arg(long, global = true)]
    pub provider: Option<String>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct PlanArgs {
    /// Background information passed to the decomposer
    #[arg(long)]
    pub context: Option<String>,

    #[arg(long)]
    pub max_subtasks: Option<usize>,

    /// Ask for independent subtasks only
    #[arg(long, default_value_t = false)]
    pub no_dependencies: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ExecOptions {
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long, value_enum)]
    pub merge: Option<MergeArg>,

    /// Maximum in-flight completion requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show progress bars on stderr
    #[arg(long, default_value_t = false)]
    pub progress: bool,

    /// Print lifecycle events on stderr (text format)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    pub description: String,

    #[command(flatten)]
    pub plan: PlanArgs,

    #[command(flatten)]
    pub exec: ExecOptions,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DecomposeArgs {
    pub description: String,

    #[command(flatten)]
    pub plan: PlanArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExecArgs {
    /// JSON task list file, or `-` for stdin
    #[arg(long)]
    pub tasks: String,

    #[command(flatten)]
    pub exec: ExecOptions,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AskArgs {
    pub prompt: String,

    #[arg(long)]
    pub system: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SkillArgs {
    /// Skill id, or several separated by commas to run them side by side
    pub skill: String,

    /// Input text, or `-` for stdin
    pub input: String,

    /// Text substituted for `{{selection}}` (defaults to the input)
    #[arg(long)]
    pub selection: Option<String>,

    /// Template value as KEY=VALUE, substituted for `{{KEY}}`
    #[arg(long = "meta", value_parser = parse_key_val)]
    pub metadata: Vec<(String, String)>,

    /// Maximum in-flight requests when running several skills
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl SkillArgs {
    pub fn skill_ids(&self) -> Vec<String> {
        self.skill
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SkillsArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompose, execute and merge
    Run(RunArgs),
    /// Print the subtask plan as JSON
    Decompose(DecomposeArgs),
    /// Execute a caller-provided task list
    Exec(ExecArgs),
    /// Stream a single completion to stdout
    Ask(AskArgs),
    /// Run a built-in or configured skill on some input
    Skill(SkillArgs),
    /// List available skills
    Skills(SkillsArgs),
}
