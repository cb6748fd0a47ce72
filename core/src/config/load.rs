use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::{AppConfig, ProviderKind};

pub const CONFIG_ENV: &str = "SUBAGENT_CONFIG";
pub const PROVIDER_ENV: &str = "SUBAGENT_PROVIDER";
pub const MODEL_ENV: &str = "SUBAGENT_MODEL";
pub const BASE_URL_ENV: &str = "SUBAGENT_BASE_URL";
pub const API_KEY_ENV: &str = "SUBAGENT_API_KEY";

/// Get the default data directory: ~/.subagent
pub fn get_subagent_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".subagent"))
}

/// Config file that `load_default` would read, if any.
pub fn find_config_file() -> anyhow::Result<Option<PathBuf>> {
    // Priority 1: $SUBAGENT_CONFIG
    if let Some(path) = non_empty_env(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if !path.exists() {
            anyhow::bail!("{} points to a missing file: {}", CONFIG_ENV, path.display());
        }
        return Ok(Some(path));
    }

    // Priority 2: ~/.subagent/config.toml
    let home_config = get_subagent_data_dir()?.join("config.toml");
    if home_config.exists() {
        return Ok(Some(home_config));
    }

    // Priority 3: ./subagent.toml
    let local_config = Path::new("subagent.toml");
    if local_config.exists() {
        return Ok(Some(local_config.to_path_buf()));
    }

    Ok(None)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    let mut cfg = match find_config_file()? {
        Some(path) => read_config_file(&path)?,
        None => AppConfig::default(),
    };

    // Log files go under ~/.subagent/logs unless a directory is configured
    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = get_subagent_data_dir()?.join("logs");
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("creating {}", logs_dir.display()))?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, non_empty_env)?;
    Ok(cfg)
}

/// Load one file and apply environment overrides.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = read_config_file(path)?;
    apply_env_overrides(&mut cfg, non_empty_env)?;
    Ok(cfg)
}

fn read_config_file(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str::<AppConfig>(&s).with_context(|| format!("parsing config {}", path.display()))
}

/// Apply `SUBAGENT_*` overrides, then fall back to the provider's own key
/// variable (e.g. `ANTHROPIC_API_KEY`) when no key is configured.
///
/// `lookup` returns `None` for unset or blank variables.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(PROVIDER_ENV) {
        cfg.provider.kind = v
            .parse::<ProviderKind>()
            .map_err(|e| anyhow::anyhow!("{}: {}", PROVIDER_ENV, e))?;
    }
    if let Some(v) = lookup(MODEL_ENV) {
        cfg.provider.model = Some(v);
    }
    if let Some(v) = lookup(BASE_URL_ENV) {
        cfg.provider.base_url = Some(v);
    }
    if let Some(v) = lookup(API_KEY_ENV) {
        cfg.provider.api_key = v;
    }

    if !cfg.provider.has_api_key() {
        if let Some(v) = lookup(cfg.provider.kind.preset().api_key_env) {
            cfg.provider.api_key = v;
        }
    }
    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
