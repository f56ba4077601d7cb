use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeline::MAX_CLIP_SECONDS;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Longest trim window, in seconds.
    pub max_clip_seconds: f64,
    /// Simulated latency of auto-edit and export.
    pub processing_delay_ms: u64,
    pub job_workers: usize,
    /// Explicit ffprobe binary; searched on `PATH` when unset.
    pub ffprobe: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_clip_seconds: MAX_CLIP_SECONDS,
            processing_delay_ms: 2000,
            job_workers: 1,
            ffprobe: None,
        }
    }
}

impl EditorConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("quickcut").join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The clip limit must be a positive finite number of seconds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_clip_seconds.is_finite() && self.max_clip_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_clip_seconds",
                reason: format!("{} is not a positive number of seconds", self.max_clip_seconds),
            });
        }
        Ok(())
    }

    /// Reads the default config file. A missing file means defaults; a broken one is logged.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else { return Self::default(); };
        if !path.exists() { return Self::default(); }
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), "failed to load config, using defaults: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        fs::write(path, toml::to_string_pretty(self)?)?;
        info!(path = %path.display(), "config saved");
        Ok(())
    }

    pub fn processing_delay(&self) -> Duration { Duration::from_millis(self.processing_delay_ms) }
}
