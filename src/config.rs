use crate::messages::MessageOverrides;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory holding project-level config, the store and the activity log
pub const CONFIG_DIR: &str = ".formstats";

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Configuration for the activity log
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ActivityConfig {
    /// Unset means enabled
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ActivityConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub messages: MessageOverrides,
    /// Files merged into this config, lowest priority first
    #[serde(skip)]
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.formstats/config.local.toml) > project (.formstats/config.toml)
    /// > user (~/.formstats/config.toml)
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = root.join(CONFIG_DIR).join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = root.join(CONFIG_DIR).join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.sources.push(path.to_path_buf());
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Config) {
        if other.store_path.is_some() {
            self.store_path = other.store_path;
        }

        if other.activity.enabled.is_some() {
            self.activity.enabled = other.activity.enabled;
        }
        if other.activity.path.is_some() {
            self.activity.path = other.activity.path;
        }

        self.messages.merge(other.messages);
        self.sources.extend(other.sources);
    }

    /// Store file location, relative paths resolved against `root`
    pub fn store_path(&self, root: &Path) -> PathBuf {
        match &self.store_path {
            Some(path) => root.join(path),
            None => root.join(CONFIG_DIR).join("store.json"),
        }
    }

    /// Activity log location, or `None` when the log is disabled
    pub fn activity_path(&self, root: &Path) -> Option<PathBuf> {
        if !self.activity.is_enabled() {
            return None;
        }
        Some(match &self.activity.path {
            Some(path) => root.join(path),
            None => root.join(CONFIG_DIR).join("activity.jsonl"),
        })
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(path) = &self.store_path {
            if path.trim().is_empty() {
                errors.push(ValidationError {
                    field: "store_path".to_string(),
                    message: "Must not be empty".to_string(),
                });
            }
        }

        if let Some(path) = &self.activity.path {
            if path.trim().is_empty() {
                errors.push(ValidationError {
                    field: "activity.path".to_string(),
                    message: "Must not be empty".to_string(),
                });
            }
        }

        for (kind, text) in self.messages.entries() {
            if let Some(text) = text {
                if text.trim().is_empty() {
                    errors.push(ValidationError {
                        field: format!("messages.{}", kind.as_str()),
                        message: "Message must not be empty".to_string(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
