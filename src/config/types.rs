// Configuration types for Flow Studio
//
// This module defines the settings read from `studio.toml` and the
// environment: simulation timing, the inference service and the diagnosis
// report conventions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::diagnosis::analysis::default_keywords;
use crate::simulation::{SimulationSettings, SinkBehavior, DEFAULT_SETTLE_DELAY, DEFAULT_STEP_DELAY};

/// Log level for the studio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Simulated run timing and failure condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// How long a node shows as running, in milliseconds
    #[serde(rename = "step_delay_ms", with = "crate::utils::duration_millis")]
    pub step_delay: Duration,
    /// Pause after a node succeeds, in milliseconds
    #[serde(rename = "settle_delay_ms", with = "crate::utils::duration_millis")]
    pub settle_delay: Duration,
    /// What happens at the last node of a chain
    pub sink_behavior: SinkBehavior,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
            sink_behavior: SinkBehavior::default(),
        }
    }
}

impl SimulationConfig {
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            step_delay: self.step_delay,
            settle_delay: self.settle_delay,
        }
    }
}

/// Inference service connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Base URL of the generative language API
    pub base_url: String,
    /// Model used for diagnosis
    pub model: String,
    /// API key; never written back to disk
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(rename = "timeout_secs", with = "crate::utils::duration_secs")]
    pub timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-pro-preview".to_string(),
            api_key: None,
            timeout: Duration::from_secs(90),
        }
    }
}

impl InferenceConfig {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().map(|k| !k.trim().is_empty()).unwrap_or(false)
    }
}

/// Diagnosis report conventions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    /// Section titles containing one of these open the alternatives list
    pub alternatives_keywords: Vec<String>,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            alternatives_keywords: default_keywords(),
        }
    }
}

/// Complete studio configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub log_level: LogLevel,
    pub simulation: SimulationConfig,
    pub inference: InferenceConfig,
    pub diagnosis: DiagnosisConfig,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    /// Validation errors
    pub errors: Vec<String>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty() || !self.warnings.is_empty()
    }
}

/// Environment variable names read by the studio
pub struct EnvVars;

impl EnvVars {
    pub const API_KEY: &'static str = "GEMINI_API_KEY";
    pub const API_KEY_FALLBACK: &'static str = "API_KEY";
    pub const MODEL: &'static str = "FLOW_STUDIO_MODEL";
    pub const BASE_URL: &'static str = "FLOW_STUDIO_BASE_URL";
    pub const LOG_LEVEL: &'static str = "FLOW_STUDIO_LOG_LEVEL";
    pub const SINK_BEHAVIOR: &'static str = "FLOW_STUDIO_SINK_BEHAVIOR";
    pub const CONFIG_DIR: &'static str = "FLOW_STUDIO_CONFIG_DIR";
}

/// Configuration file paths and names
pub struct ConfigPaths;

impl ConfigPaths {
    /// Directory name under the platform config dir
    pub const CONFIG_DIR_NAME: &'static str = "flow-studio";

    /// Studio configuration file name
    pub const CONFIG_FILE: &'static str = "studio.toml";

    /// Get the default configuration directory
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::CONFIG_DIR_NAME))
            .context("Failed to determine configuration directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.simulation.step_delay, Duration::from_millis(600));
        assert_eq!(config.simulation.settle_delay, Duration::from_millis(200));
        assert_eq!(config.simulation.sink_behavior, SinkBehavior::Fail);
        assert_eq!(config.inference.timeout, Duration::from_secs(90));
        assert!(!config.inference.has_api_key());
        assert!(config.diagnosis.alternatives_keywords.contains(&"alternativas".to_string()));
    }

    #[test]
    fn test_partial_toml() {
        let config: StudioConfig = toml::from_str(
            r#"
            log_level = "debug"

            [simulation]
            step_delay_ms = 100
            sink_behavior = "complete"

            [inference]
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.simulation.step_delay, Duration::from_millis(100));
        assert_eq!(config.simulation.settle_delay, Duration::from_millis(200));
        assert_eq!(config.simulation.sink_behavior, SinkBehavior::Complete);
        assert_eq!(config.inference.timeout, Duration::from_secs(30));
        assert_eq!(config.inference.model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = StudioConfig::default();
        config.inference.api_key = Some("secret".to_string());
        let content = toml::to_string_pretty(&config).unwrap();
        assert!(!content.contains("secret"));
    }
}
