//! Host configuration.
//!
//! Loaded from a JSON file; every field has a default so a config only needs
//! to name what it changes. Unknown fields are rejected so a typo does not
//! silently fall back to a default.

use std::fs;
use std::path::{Path, PathBuf};

use lf_core::curve::ResponseCurve;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Serde {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Directory holding the drawing PNGs and the manifest.
    pub image_dir: PathBuf,
    pub manifest_name: String,
    /// Base URL of the command server.
    pub server_url: String,
    /// Per-frame time budget for the record scan.
    pub frame_budget_ms: f64,
    pub frame_rate: u32,
    /// Longest frame delta fed to timers, in seconds.
    pub max_frame_dt: f64,
    pub poll_interval_secs: f64,
    pub sync_interval_secs: f64,
    /// Mirror approved drawings from the server into `image_dir`.
    pub sync_enabled: bool,
    pub effect_duration_secs: f32,
    pub spawn_interval_secs: f32,
    pub spawn_interval_randomness_secs: f32,
    pub palette_blend_top: usize,
    /// Weight by normalized age rank (0 = newest) for random picks.
    pub age_weighting: ResponseCurve,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("Images"),
            manifest_name: "index.txt".to_string(),
            server_url: "http://localhost:8000".to_string(),
            frame_budget_ms: 1.0,
            frame_rate: 60,
            max_frame_dt: 0.25,
            poll_interval_secs: 1.0,
            sync_interval_secs: 1.5,
            sync_enabled: false,
            effect_duration_secs: 5.0,
            spawn_interval_secs: 4.0,
            spawn_interval_randomness_secs: 2.0,
            palette_blend_top: 2,
            age_weighting: ResponseCurve::default(),
        }
    }
}

impl ClientConfig {
    pub fn manifest_path(&self) -> PathBuf {
        self.image_dir.join(&self.manifest_name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.manifest_name.trim().is_empty() {
            return Err("manifest_name must not be empty".to_string());
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(format!(
                "server_url must be an http(s) URL, got '{}'",
                self.server_url
            ));
        }
        if !(self.frame_budget_ms >= 0.0) {
            return Err("frame_budget_ms must be >= 0".to_string());
        }
        if self.frame_rate == 0 {
            return Err("frame_rate must be > 0".to_string());
        }
        for (name, value) in [
            ("max_frame_dt", self.max_frame_dt),
            ("poll_interval_secs", self.poll_interval_secs),
            ("sync_interval_secs", self.sync_interval_secs),
            ("effect_duration_secs", self.effect_duration_secs as f64),
            ("spawn_interval_secs", self.spawn_interval_secs as f64),
        ] {
            if !(value > 0.0) {
                return Err(format!("{name} must be > 0, got {value}"));
            }
        }
        if !(self.spawn_interval_randomness_secs >= 0.0) {
            return Err("spawn_interval_randomness_secs must be >= 0".to_string());
        }
        if self.palette_blend_top == 0 {
            return Err("palette_blend_top must be at least 1".to_string());
        }
        self.age_weighting
            .validate()
            .map_err(|e| format!("age_weighting: {e}"))
    }
}

pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ClientConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}
