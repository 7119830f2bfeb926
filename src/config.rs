use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::measure::stream::{AnalysisSettings, RmsPooling};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub advice: AdviceConfig,
    #[serde(default)]
    pub separation: SeparationConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Encoded size in MB from which sources are read in windows
    #[serde(default = "default_large_file_mb")]
    pub large_file_mb: u64,
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: f64,
    #[serde(default)]
    pub pooling: RmsPooling,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AdviceConfig {
    #[serde(default = "default_too_quiet_below_db")]
    pub too_quiet_below_db: f64,
    #[serde(default = "default_acceptable_min_db")]
    pub acceptable_min_db: f64,
    #[serde(default = "default_acceptable_max_db")]
    pub acceptable_max_db: f64,
    #[serde(default = "default_clipping_above_db")]
    pub clipping_above_db: f64,
    #[serde(default = "default_vocals_quiet_below_db")]
    pub vocals_quiet_below_db: f64,
    #[serde(default = "default_bass_quiet_below_db")]
    pub bass_quiet_below_db: f64,
}

#[derive(Debug, Deserialize)]
pub struct SeparationConfig {
    #[serde(default = "default_separation_command")]
    pub command: String,
    #[serde(default = "default_separation_model")]
    pub model: String,
    #[serde(default = "default_separation_max_mb")]
    pub max_file_mb: u64,
    /// Inputs longer than this log a slow-processing warning
    #[serde(default = "default_long_input_seconds")]
    pub long_input_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            large_file_mb: default_large_file_mb(),
            chunk_seconds: default_chunk_seconds(),
            pooling: RmsPooling::default(),
        }
    }
}

impl Default for AdviceConfig {
    fn default() -> Self {
        Self {
            too_quiet_below_db: default_too_quiet_below_db(),
            acceptable_min_db: default_acceptable_min_db(),
            acceptable_max_db: default_acceptable_max_db(),
            clipping_above_db: default_clipping_above_db(),
            vocals_quiet_below_db: default_vocals_quiet_below_db(),
            bass_quiet_below_db: default_bass_quiet_below_db(),
        }
    }
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            command: default_separation_command(),
            model: default_separation_model(),
            max_file_mb: default_separation_max_mb(),
            long_input_seconds: default_long_input_seconds(),
        }
    }
}

impl AnalysisConfig {
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            large_file_bytes: self.large_file_mb.saturating_mul(1024 * 1024),
            chunk_seconds: self.chunk_seconds,
            pooling: self.pooling,
        }
    }
}

fn default_large_file_mb() -> u64 { 100 }
fn default_chunk_seconds() -> f64 { 30.0 }
fn default_too_quiet_below_db() -> f64 { -23.0 }
fn default_acceptable_min_db() -> f64 { -20.0 }
fn default_acceptable_max_db() -> f64 { -16.0 }
fn default_clipping_above_db() -> f64 { -1.0 }
fn default_vocals_quiet_below_db() -> f64 { -25.0 }
fn default_bass_quiet_below_db() -> f64 { -20.0 }
fn default_separation_command() -> String { "demucs".into() }
fn default_separation_model() -> String { "htdemucs".into() }
fn default_separation_max_mb() -> u64 { 500 }
fn default_long_input_seconds() -> f64 { 600.0 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, then `./pa-meter.toml`, then the per-user config files.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("pa-meter.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pa-meter").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pa-meter").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
