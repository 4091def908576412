//! Process configuration.
//!
//! Defaults are built in; an optional JSON file replaces them and a handful of
//! environment variables override the result. The API key is only ever read
//! from the environment.
use crate::pipeline::Budgets;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Current schema version for config files.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const ENV_CONFIG: &str = "PXO_CONFIG";
pub const ENV_API_KEY: &str = "PXO_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
const ENV_API_URL: &str = "PXO_API_URL";
const ENV_MODEL: &str = "PXO_MODEL";
const ENV_BIND: &str = "PXO_BIND";
const ENV_TIMEOUT_SECS: &str = "PXO_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PxoConfig {
    pub schema_version: u32,
    pub api_url: String,
    pub model: String,
    pub anthropic_version: String,
    /// Whole-call timeout for each model request.
    pub timeout_secs: u64,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub budgets: Budgets,
}

impl Default for PxoConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-opus-4-6".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            timeout_secs: 300,
            bind_addr: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            budgets: Budgets::default(),
        }
    }
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<PxoConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: PxoConfig = serde_json::from_slice(&bytes).context("parse pxo config JSON")?;
    Ok(config)
}

/// Resolve the effective config: explicit path, then `PXO_CONFIG`, then
/// defaults; environment overrides applied last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<PxoConfig> {
    let mut config = match explicit {
        Some(path) => load_config(path)?,
        None => match env::var(ENV_CONFIG) {
            Ok(path) if !path.trim().is_empty() => load_config(Path::new(path.trim()))
                .with_context(|| format!("load config from {ENV_CONFIG}"))?,
            _ => PxoConfig::default(),
        },
    };
    apply_env_overrides(&mut config, |name| env::var(name).ok())?;
    validate_config(&config)?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut PxoConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    if let Some(url) = non_empty(ENV_API_URL) {
        config.api_url = url;
    }
    if let Some(model) = non_empty(ENV_MODEL) {
        config.model = model;
    }
    if let Some(bind) = non_empty(ENV_BIND) {
        config.bind_addr = bind;
    }
    if let Some(raw) = non_empty(ENV_TIMEOUT_SECS) {
        config.timeout_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("parse {ENV_TIMEOUT_SECS}={raw:?}"))?;
    }
    Ok(())
}

/// Validate schema version, endpoints and budgets.
pub fn validate_config(config: &PxoConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported pxo config schema_version {}",
            config.schema_version
        ));
    }
    if config.api_url.trim().is_empty() {
        return Err(anyhow!("api_url must be non-empty"));
    }
    if config.model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    if config.timeout_secs == 0 {
        return Err(anyhow!("timeout_secs must be positive"));
    }
    if config.max_upload_bytes == 0 {
        return Err(anyhow!("max_upload_bytes must be positive"));
    }
    let budgets = &config.budgets;
    for (name, value) in [
        ("pre_analysis", budgets.pre_analysis),
        ("step", budgets.step),
        ("summary", budgets.summary),
        ("single_shot", budgets.single_shot),
    ] {
        if value == 0 {
            return Err(anyhow!("budgets.{name} must be positive"));
        }
    }
    if budgets.pre_analysis >= budgets.step {
        return Err(anyhow!(
            "budgets.pre_analysis ({}) must be smaller than budgets.step ({})",
            budgets.pre_analysis,
            budgets.step
        ));
    }
    Ok(())
}

/// API key from `PXO_API_KEY`, falling back to `ANTHROPIC_API_KEY`.
pub fn resolve_api_key() -> Option<String> {
    [ENV_API_KEY, ENV_ANTHROPIC_API_KEY]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
