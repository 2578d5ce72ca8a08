use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Items per run for the default section grouping.
    #[serde(default = "default_section_chunk_size")]
    pub section_chunk_size: usize,
    /// Rows from the end at which positional access may trigger `load_more`.
    #[serde(default = "default_load_more_offset")]
    pub load_more_offset: usize,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Lists untouched for longer are dropped by `remove_expired`.
    #[serde(default = "default_max_list_age_days")]
    pub max_list_age_days: u32,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            section_chunk_size: default_section_chunk_size(),
            load_more_offset: default_load_more_offset(),
            worker_threads: default_worker_threads(),
            max_list_age_days: default_max_list_age_days(),
            db_path: None,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn max_list_age(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_list_age_days) * 24 * 60 * 60)
    }
}

const fn default_section_chunk_size() -> usize {
    10
}

const fn default_load_more_offset() -> usize {
    10
}

const fn default_worker_threads() -> usize {
    2
}

const fn default_max_list_age_days() -> u32 {
    30
}

/// Load engine settings from a TOML file; a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_config(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse engine settings from TOML text.
///
/// # Errors
///
/// Returns [`crate::error::StoreError::Config`] on malformed TOML.
pub fn parse_config(content: &str) -> Result<EngineConfig, crate::error::StoreError> {
    Ok(toml::from_str::<EngineConfig>(content)?)
}
