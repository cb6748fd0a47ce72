//! CLI wiring: merge flag overrides into the config, build the backend and
//! engine, and print results in the requested format.

use std::io::{Read, Write};
use std::sync::Arc;

use serde::Deserialize;
use subagent_core::api::{
    AggregatedResult, AppConfig, CompletionService, DecompositionConstraints, ExecutionEngine,
    ExecutionMode, ExecutorConfig, Message, ProviderConfig, ProviderKind, SkillCategory,
    SkillContext, SkillDefinition, SkillRegistry, SkillResult, Task, TaskDecomposer,
};
use subagent_core::config::API_KEY_ENV;
use subagent_plugins::factory::{build_completion_service, build_observer};

use crate::commands::cli::{
    Args, AskArgs, Commands, DecomposeArgs, ExecArgs, ExecOptions, OutputFormat, PlanArgs, RunArgs,
    SkillArgs, SkillsArgs,
};
use crate::error::CliError;

/// Apply global `--provider/--model/--base-url` flags.
pub fn apply_provider_overrides(cfg: &mut AppConfig, args: &Args) -> Result<(), CliError> {
    if let Some(provider) = args.provider.as_deref() {
        let kind = provider.parse::<ProviderKind>().map_err(CliError::Config)?;
        if kind != cfg.provider.kind {
            // Key, model and endpoint of the previous provider do not carry over.
            cfg.provider = ProviderConfig {
                api_key: env_key(API_KEY_ENV)
                    .or_else(|| env_key(kind.preset().api_key_env))
                    .unwrap_or_default(),
                timeout_ms: cfg.provider.timeout_ms,
                max_tokens: cfg.provider.max_tokens,
                ..ProviderConfig::for_kind(kind)
            };
        }
    }
    if let Some(model) = &args.model {
        cfg.provider.model = Some(model.clone());
    }
    if let Some(url) = &args.base_url {
        cfg.provider.base_url = Some(url.clone());
    }
    Ok(())
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn executor_config(cfg: &AppConfig, opts: &ExecOptions) -> ExecutorConfig {
    let mut exec = cfg.executor.clone();
    if let Some(mode) = opts.mode {
        exec.mode = mode.into();
    }
    if let Some(merge) = opts.merge {
        exec.merge_strategy = merge.into();
    }
    if let Some(n) = opts.concurrency {
        exec.max_concurrency = n;
    }
    exec.progress_bar = exec.progress_bar || opts.progress;
    exec
}

pub fn constraints(cfg: &AppConfig, plan: &PlanArgs) -> DecompositionConstraints {
    let mut constraints = cfg.decomposition.clone();
    if let Some(n) = plan.max_subtasks {
        constraints.max_sub_tasks = n;
    }
    if plan.no_dependencies {
        constraints.allow_dependencies = false;
    }
    constraints
}

#[tracing::instrument(name = "cli.dispatch", skip_all)]
pub async fn dispatch(args: Args, mut cfg: AppConfig) -> Result<i32, CliError> {
    apply_provider_overrides(&mut cfg, &args)?;
    if let Commands::Skills(list) = &args.command {
        return skills_command(list, &cfg);
    }
    let service = build_completion_service(&cfg.provider)?;

    match args.command {
        Commands::Run(run) => run_command(run, &cfg, service).await,
        Commands::Decompose(dec) => decompose_command(dec, &cfg, service).await,
        Commands::Exec(exec) => exec_command(exec, &cfg, service).await,
        Commands::Ask(ask) => ask_command(ask, service).await,
        Commands::Skill(skill) => skill_command(skill, &cfg, service).await,
        Commands::Skills(list) => skills_command(&list, &cfg),
    }
}

fn ensure_configured(cfg: &AppConfig, service: &dyn CompletionService) -> Result<(), CliError> {
    if service.is_configured() {
        return Ok(());
    }
    Err(CliError::Config(format!(
        "no API key for provider '{}' (set {} or SUBAGENT_API_KEY, or provider.api_key in the config file)",
        cfg.provider.kind,
        cfg.provider.kind.preset().api_key_env
    )))
}

fn build_engine(
    cfg: &AppConfig,
    service: Arc<dyn CompletionService>,
    opts: &ExecOptions,
    plan: Option<&PlanArgs>,
) -> ExecutionEngine {
    let mut builder = ExecutionEngine::builder(service).config(executor_config(cfg, opts));
    if let Some(plan) = plan {
        builder = builder.constraints(constraints(cfg, plan));
    }
    if let Some(observer) = build_observer(opts.format.as_str(), opts.verbose) {
        builder = builder.observer(observer);
    }
    builder.build()
}

pub async fn run_command(
    args: RunArgs,
    cfg: &AppConfig,
    service: Arc<dyn CompletionService>,
) -> Result<i32, CliError> {
    let engine = build_engine(cfg, service, &args.exec, Some(&args.plan));
    let mode: ExecutionMode = engine.config().mode;

    let result = engine
        .decompose_and_execute(&args.description, args.plan.context.as_deref(), mode)
        .await?;
    finish(&result, args.exec.format)
}

pub async fn decompose_command(
    args: DecomposeArgs,
    cfg: &AppConfig,
    service: Arc<dyn CompletionService>,
) -> Result<i32, CliError> {
    ensure_configured(cfg, service.as_ref())?;
    let decomposer = TaskDecomposer::with_constraints(service, constraints(cfg, &args.plan));
    let tasks = decomposer
        .decompose(&args.description, args.plan.context.as_deref(), None)
        .await;

    let out = serde_json::to_string_pretty(&serde_json::json!({ "subtasks": tasks }))?;
    println!("{out}");
    Ok(0)
}

pub async fn exec_command(
    args: ExecArgs,
    cfg: &AppConfig,
    service: Arc<dyn CompletionService>,
) -> Result<i32, CliError> {
    let input = if args.tasks == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.tasks)?
    };
    let tasks = parse_task_list(&input)?;

    let engine = build_engine(cfg, service, &args.exec, None);
    let mode = engine.config().mode;
    let result = engine.execute(&tasks, mode).await?;
    finish(&result, args.exec.format)
}

pub async fn ask_command(args: AskArgs, service: Arc<dyn CompletionService>) -> Result<i32, CliError> {
    if !service.is_configured() {
        return Err(CliError::Config(format!(
            "completion service '{}' has no API key",
            service.name()
        )));
    }

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let mut stdout = std::io::stdout();
    let mut on_chunk = |chunk: &str| {
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    };
    service
        .send_streaming(&messages, &mut on_chunk)
        .await
        .map_err(anyhow::Error::from)?;
    println!();
    Ok(0)
}

pub async fn skill_command(
    args: SkillArgs,
    cfg: &AppConfig,
    service: Arc<dyn CompletionService>,
) -> Result<i32, CliError> {
    let registry = SkillRegistry::with_custom(&cfg.skills)?;
    let ids = args.skill_ids();
    if ids.is_empty() {
        return Err(CliError::Config("no skill id given".to_string()));
    }
    ensure_configured(cfg, service.as_ref())?;

    let input = if args.input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.input.clone()
    };
    let mut ctx = SkillContext::new(input);
    ctx.selection = args.selection.clone();
    ctx.metadata.extend(args.metadata.iter().cloned());

    let concurrency = args.concurrency.unwrap_or(cfg.executor.max_concurrency);
    let results = registry
        .execute_parallel(service.as_ref(), &ids, &ctx, concurrency)
        .await?;

    for failed in results.iter().filter(|r| !r.success) {
        eprintln!(
            "skill '{}' failed: {}",
            failed.skill_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("{}", render_skill_results(&results, args.format)?);
    Ok(if results.iter().all(|r| r.success) { 0 } else { 1 })
}

pub fn skills_command(args: &SkillsArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let registry = SkillRegistry::with_custom(&cfg.skills)?;
    println!("{}", render_skill_list(registry.list(), args.format)?);
    Ok(0)
}

/// One result prints its content alone; several are labelled by skill id.
pub fn render_skill_results(
    results: &[SkillResult],
    format: OutputFormat,
) -> Result<String, CliError> {
    Ok(match (format, results) {
        (OutputFormat::Text, [single]) => single.content.clone(),
        (OutputFormat::Text, many) => many
            .iter()
            .map(|r| format!("## {}\n\n{}", r.skill_id, r.content))
            .collect::<Vec<_>>()
            .join("\n\n"),
        (OutputFormat::Json, [single]) => serde_json::to_string_pretty(single)?,
        (OutputFormat::Json, many) => serde_json::to_string_pretty(many)?,
        (OutputFormat::Jsonl, many) => many
            .iter()
            .map(|r| {
                serde_json::to_string(&serde_json::json!({
                    "v": 1,
                    "event_type": "skill.result",
                    "result": r,
                }))
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    })
}

pub fn render_skill_list(
    skills: &[SkillDefinition],
    format: OutputFormat,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => {
            let width = skills.iter().map(|s| s.id.len()).max().unwrap_or(0);
            skills
                .iter()
                .map(|s| {
                    let category = match s.category {
                        SkillCategory::Predefined => "built-in",
                        SkillCategory::Custom => "custom",
                    };
                    format!("{:<width$}  {:<8}  {}", s.id, category, s.name, width = width)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        OutputFormat::Json => serde_json::to_string_pretty(skills)?,
        OutputFormat::Jsonl => skills
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    })
}

/// Task list accepted by `exec`: a bare array or a plan object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListInput {
    List(Vec<Task>),
    Subtasks { subtasks: Vec<Task> },
    Tasks { tasks: Vec<Task> },
}

pub fn parse_task_list(input: &str) -> Result<Vec<Task>, CliError> {
    let parsed: TaskListInput = serde_json::from_str(input)?;
    Ok(match parsed {
        TaskListInput::List(tasks)
        | TaskListInput::Subtasks { subtasks: tasks }
        | TaskListInput::Tasks { tasks } => tasks,
    })
}

pub fn render_result(result: &AggregatedResult, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => result.merged_content.clone().unwrap_or_default(),
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Jsonl => serde_json::to_string(&serde_json::json!({
            "v": 1,
            "event_type": "result",
            "run_id": result.run_id,
            "result": result,
        }))?,
    })
}

fn finish(result: &AggregatedResult, format: OutputFormat) -> Result<i32, CliError> {
    println!("{}", render_result(result, format)?);
    Ok(if result.all_succeeded() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use subagent_core::api::{MergeStrategy, SkillConfig, TaskResult};

    #[test]
    fn parses_all_task_list_shapes() {
        let bare = r#"[{"id":"a","description":"a","prompt":"do a"}]"#;
        let plan = r#"{"subtasks":[{"id":"a","description":"a","prompt":"do a"},{"id":"b","description":"b","prompt":"do b","dependencies":["a"]}]}"#;
        let named = r#"{"tasks":[{"id":"a","description":"a","prompt":"do a"}]}"#;

        assert_eq!(parse_task_list(bare).unwrap().len(), 1);
        let tasks = parse_task_list(plan).unwrap();
        assert_eq!(tasks[1].dependencies, vec!["a".to_string()]);
        assert_eq!(parse_task_list(named).unwrap()[0].prompt, "do a");
        assert!(matches!(parse_task_list("{}"), Err(CliError::Json(_))));
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "subagent",
            "run",
            "x",
            "--merge",
            "concatenate",
            "--concurrency",
            "2",
            "--max-subtasks",
            "7",
            "--no-dependencies",
        ])
        .unwrap();
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };

        let cfg = AppConfig::default();
        let exec = executor_config(&cfg, &run.exec);
        assert_eq!(exec.merge_strategy, MergeStrategy::Concatenate);
        assert_eq!(exec.max_concurrency, 2);
        assert_eq!(exec.mode, ExecutionMode::Hybrid);

        let limits = constraints(&cfg, &run.plan);
        assert_eq!(limits.max_sub_tasks, 7);
        assert!(!limits.allow_dependencies);
    }

    #[test]
    fn model_and_base_url_flags_apply() {
        let args = Args::try_parse_from([
            "subagent",
            "--model",
            "claude-3-haiku-20240307",
            "--base-url",
            "http://localhost:9000",
            "ask",
            "hi",
        ])
        .unwrap();
        let mut cfg = AppConfig::default();
        apply_provider_overrides(&mut cfg, &args).unwrap();
        assert_eq!(cfg.provider.resolved_model(), "claude-3-haiku-20240307");
        assert_eq!(cfg.provider.resolved_base_url(), "http://localhost:9000");
    }

    #[test]
    fn renders_each_format() {
        let result = AggregatedResult::new(
            "run-1".into(),
            ExecutionMode::Sequential,
            1,
            vec![TaskResult::succeeded("a", "out".into(), Duration::from_millis(3))],
            Some("merged".into()),
            Duration::from_millis(5),
        );

        assert_eq!(render_result(&result, OutputFormat::Text).unwrap(), "merged");

        let json: serde_json::Value =
            serde_json::from_str(&render_result(&result, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["successful_tasks"], 1);

        let line = render_result(&result, OutputFormat::Jsonl).unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event_type"], "result");
        assert_eq!(value["run_id"], "run-1");
    }

    fn skill_result(id: &str, content: &str, success: bool) -> SkillResult {
        SkillResult {
            skill_id: id.to_string(),
            success,
            content: content.to_string(),
            error: (!success).then(|| "timeout".to_string()),
            execution_time_ms: 4,
        }
    }

    #[test]
    fn renders_skill_results() {
        let one = [skill_result("summarize", "short", true)];
        assert_eq!(render_skill_results(&one, OutputFormat::Text).unwrap(), "short");

        let two = [
            skill_result("summarize", "short", true),
            skill_result("translate", "", false),
        ];
        assert_eq!(
            render_skill_results(&two, OutputFormat::Text).unwrap(),
            "## summarize\n\nshort\n\n## translate\n\n"
        );

        let json: serde_json::Value =
            serde_json::from_str(&render_skill_results(&two, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[1]["error"], "timeout");

        let lines = render_skill_results(&two, OutputFormat::Jsonl).unwrap();
        assert_eq!(lines.lines().count(), 2);
    }

    #[test]
    fn skill_list_includes_configured_skills() {
        let cfg = AppConfig {
            skills: vec![SkillConfig {
                id: "haiku".into(),
                name: "Haiku".into(),
                description: String::new(),
                prompt_template: "Haiku about {{input}}".into(),
                icon: None,
            }],
            ..AppConfig::default()
        };
        let registry = SkillRegistry::with_custom(&cfg.skills).unwrap();

        let text = render_skill_list(registry.list(), OutputFormat::Text).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 4);
        assert!(rows[0].starts_with("summarize"));
        assert!(rows[0].contains("built-in"));
        assert!(rows[3].starts_with("haiku"));
        assert!(rows[3].contains("custom"));
    }
}
