//! Host configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via SMCTL_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use smctl_core::ControllerConfig;
use std::path::{Path, PathBuf};

/// Host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Controller configuration.
    pub controller: ControllerSection,
    /// Definition document configuration.
    pub definition: DefinitionConfig,
    /// Cycle loop configuration.
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Loads configuration from the file named by SMCTL_CONFIG, then applies
    /// environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`Config::load`] with an explicit file taking precedence over
    /// SMCTL_CONFIG.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("SMCTL_CONFIG") {
                Ok(path) => Self::from_file(path)?,
                Err(_) => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.controller.apply_overrides(&var);
        self.definition.apply_overrides(&var);
        self.runtime.apply_overrides(&var);
    }

    /// Rejects settings the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let device_id = &self.controller.device_id;
        if device_id.is_empty() {
            return Err(ConfigError::ValidationError(
                "controller.device_id must not be empty".to_string(),
            ));
        }
        if device_id.contains('.') {
            return Err(ConfigError::ValidationError(format!(
                "controller.device_id '{}' must not contain '.'",
                device_id
            )));
        }
        if self.controller.max_machines == 0 {
            return Err(ConfigError::ValidationError(
                "controller.max_machines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Scope of local variables.
    pub device_id: String,
    /// Maximum machines loaded from a definition.
    pub max_machines: usize,
    /// Sleep between cycles when the definition has no `t` expression.
    pub default_sleep_ms: u32,
}

impl Default for ControllerSection {
    fn default() -> Self {
        let defaults = ControllerConfig::default();
        Self {
            device_id: defaults.device_id,
            max_machines: defaults.max_machines,
            default_sleep_ms: defaults.default_sleep,
        }
    }
}

impl ControllerSection {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(id) = var("SMCTL_DEVICE_ID") {
            self.device_id = id;
        }

        if let Some(max) = var("SMCTL_MAX_MACHINES") {
            if let Ok(n) = max.parse() {
                self.max_machines = n;
            }
        }

        if let Some(sleep) = var("SMCTL_DEFAULT_SLEEP_MS") {
            if let Ok(ms) = sleep.parse() {
                self.default_sleep_ms = ms;
            }
        }
    }

    pub fn to_controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            device_id: self.device_id.clone(),
            max_machines: self.max_machines,
            default_sleep: self.default_sleep_ms,
        }
    }
}

/// Definition document configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionConfig {
    /// Path to the JSON definition.
    pub path: Option<PathBuf>,
}

impl DefinitionConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("SMCTL_DEFINITION") {
            self.path = Some(PathBuf::from(path));
        }
    }
}

/// Cycle loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Stop after this many cycles. Unbounded when absent.
    pub max_cycles: Option<u64>,
    /// Register the built-in actions, functions and the `sys` plugin.
    pub builtins: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_cycles: None,
            builtins: true,
        }
    }
}

impl RuntimeConfig {
    fn apply_overrides(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(max) = var("SMCTL_MAX_CYCLES") {
            if let Ok(n) = max.parse() {
                self.max_cycles = Some(n);
            }
        }

        if let Some(enabled) = var("SMCTL_BUILTINS") {
            self.builtins = enabled == "1" || enabled.to_lowercase() == "true";
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
