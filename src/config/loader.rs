//! Configuration loading
//!
//! Loads the YAML config file when present, falls back to built-in defaults,
//! and applies environment variable overrides on top.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::{paths, schema::Settings};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the effective configuration
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Config file
    /// 3. Built-in defaults
    pub fn load() -> Result<Settings> {
        let path = paths::config_path();
        let settings = if path.exists() {
            Self::load_file(&path)?
        } else {
            Settings::default()
        };
        Ok(Self::apply_env_overrides(settings))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Settings> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(settings)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut settings: Settings) -> Settings {
        if let Ok(path) = std::env::var("KOMPASS_KUBECONFIG") {
            settings.kubeconfig = Some(PathBuf::from(path));
        }
        if let Ok(interval) = std::env::var("KOMPASS_CRAWL_INTERVAL")
            && let Ok(secs) = interval.parse::<u64>()
        {
            settings.crawl_interval_secs = secs;
        }
        settings
    }

    /// Save configuration to a file
    pub fn save(settings: &Settings, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }
        let yaml =
            serde_yaml::to_string(settings).context("Failed to serialize configuration to YAML")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}
