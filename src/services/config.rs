use crate::{ContractRange, DEFAULT_OUT_DIR, DEFAULT_SEED, DEFAULT_SUITE};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct EvalConfig {
    #[serde(default)]
    pub contract: ContractRange,
    #[serde(default)]
    pub run: RunDefaults,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct RunDefaults {
    #[serde(default = "default_suite")]
    pub suite: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_suite() -> String {
    DEFAULT_SUITE.to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUT_DIR)
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            out_dir: default_out_dir(),
            seed: default_seed(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/evalcal/config.toml"))
}

/// An explicit path must exist; the default path is optional.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<EvalConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(EvalConfig::default()),
        },
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: EvalConfig =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}
