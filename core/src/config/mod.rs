//! Application configuration: TOML file plus `SUBAGENT_*` environment overrides.

mod load;
mod types;

pub use load::{
    apply_env_overrides, find_config_file, get_subagent_data_dir, load_default, load_from_path,
    API_KEY_ENV, BASE_URL_ENV, CONFIG_ENV, MODEL_ENV, PROVIDER_ENV,
};
pub use types::{
    AppConfig, LoggingConfig, ProviderConfig, ProviderKind, ProviderPreset, SkillConfig,
};
