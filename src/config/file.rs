// src/config/file.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "AUGMENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/augment.toml";

/// Optional settings file. Every field can also come from the CLI/env.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub work_dir: Option<PathBuf>,
    pub storage_protocol: Option<String>,
    pub local_data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub run_budget_secs: Option<u64>,
    pub registry: FileRegistryConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileRegistryConfig {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub auth_token: Option<String>,
    pub client_id: Option<u32>,
}

/// Load settings from an explicit TOML path.
pub fn load_from(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading augment config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the settings file:
/// 1) explicit path (CLI flag or $AUGMENT_CONFIG_PATH), which must exist
/// 2) config/augment.toml
/// 3) nothing: all defaults
pub fn load_default(explicit: Option<&Path>) -> Result<FileConfig> {
    let from_env = std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
    if let Some(p) = explicit.map(Path::to_path_buf).or(from_env) {
        if p.exists() {
            return load_from(&p);
        }
        return Err(anyhow!("augment config {} does not exist", p.display()));
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
    if fallback.exists() {
        return load_from(&fallback);
    }
    Ok(FileConfig::default())
}
