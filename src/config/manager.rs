// Configuration Manager implementation for Flow Studio
//
// Loads `studio.toml` from the configuration directory and applies
// environment overrides on top.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use super::types::{ConfigPaths, EnvVars, LogLevel, StudioConfig, ValidationResult};
use crate::simulation::SinkBehavior;

/// Main configuration manager for Flow Studio
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Effective configuration
    config: StudioConfig,
    /// Path to configuration directory
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a configuration manager from the default locations and the
    /// process environment
    pub async fn new() -> Result<Self> {
        tracing::debug!("Initializing configuration manager");

        let config_dir = Self::determine_config_dir()?;
        let mut manager = Self::with_config_dir(config_dir).await?;
        manager.apply_env_overrides(|name| env::var(name).ok());

        tracing::info!("Configuration loaded successfully");
        Ok(manager)
    }

    /// Create a configuration manager reading only `dir/studio.toml`
    pub async fn with_config_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let config_dir = dir.as_ref().to_path_buf();
        tracing::debug!("Using configuration directory: {:?}", config_dir);

        let mut manager = Self {
            config: StudioConfig::default(),
            config_dir,
        };
        manager.load_config_file().await?;
        Ok(manager)
    }

    /// Determine the configuration directory to use
    fn determine_config_dir() -> Result<PathBuf> {
        if let Ok(config_dir) = env::var(EnvVars::CONFIG_DIR) {
            return Ok(PathBuf::from(config_dir));
        }
        ConfigPaths::default_config_dir()
    }

    /// Path of the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(ConfigPaths::CONFIG_FILE)
    }

    async fn load_config_file(&mut self) -> Result<()> {
        let config_file = self.config_file();

        if !config_file.exists() {
            tracing::debug!("Configuration file not found, using defaults");
            return Ok(());
        }

        tracing::debug!("Loading configuration from: {:?}", config_file);

        let content = async_fs::read_to_string(&config_file)
            .await
            .context("Failed to read configuration file")?;

        self.config = toml::from_str(&content).context("Failed to parse configuration file")?;

        tracing::debug!("Configuration loaded from file");
        Ok(())
    }

    /// Apply environment overrides; environment values take precedence over
    /// the file. Unparseable values are ignored with a warning.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        tracing::debug!("Loading configuration from environment variables");

        if let Some(api_key) = lookup(EnvVars::API_KEY).or_else(|| lookup(EnvVars::API_KEY_FALLBACK)) {
            self.config.inference.api_key = Some(api_key);
            tracing::debug!("Loaded API key from environment");
        }

        if let Some(model) = lookup(EnvVars::MODEL) {
            self.config.inference.model = model;
        }

        if let Some(base_url) = lookup(EnvVars::BASE_URL) {
            self.config.inference.base_url = base_url;
        }

        if let Some(level) = lookup(EnvVars::LOG_LEVEL) {
            match level.parse::<LogLevel>() {
                Ok(level) => self.config.log_level = level,
                Err(e) => tracing::warn!("Ignoring {}: {}", EnvVars::LOG_LEVEL, e),
            }
        }

        if let Some(behavior) = lookup(EnvVars::SINK_BEHAVIOR) {
            match behavior.parse::<SinkBehavior>() {
                Ok(behavior) => self.config.simulation.sink_behavior = behavior,
                Err(e) => tracing::warn!("Ignoring {}: {}", EnvVars::SINK_BEHAVIOR, e),
            }
        }
    }

    /// Get the effective configuration
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StudioConfig {
        &mut self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Validate the current configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !self.config.inference.has_api_key() {
            result.add_warning(format!(
                "No API key configured; set {} to enable diagnosis",
                EnvVars::API_KEY
            ));
        }

        if self.config.inference.timeout.is_zero() {
            result.add_error("inference.timeout_secs must be greater than 0".to_string());
        }

        if !self.config.inference.base_url.starts_with("http") {
            result.add_error(format!("Invalid inference base URL: {}", self.config.inference.base_url));
        }

        if self.config.diagnosis.alternatives_keywords.iter().all(|k| k.trim().is_empty()) {
            result.add_warning("No alternatives keywords configured".to_string());
        }

        result
    }

    /// Save the current configuration to `studio.toml`
    pub async fn save(&self) -> Result<()> {
        tracing::debug!("Saving configuration");

        if !self.config_dir.exists() {
            async_fs::create_dir_all(&self.config_dir)
                .await
                .context("Failed to create configuration directory")?;
            tracing::info!("Created configuration directory: {:?}", self.config_dir);
        }

        let content = toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;
        async_fs::write(self.config_file(), content)
            .await
            .context("Failed to write configuration file")?;

        tracing::info!("Configuration saved successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_config_dir(temp_dir.path()).await.unwrap();
        assert_eq!(manager.config(), &StudioConfig::default());
    }

    #[tokio::test]
    async fn test_file_is_loaded() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(ConfigPaths::CONFIG_FILE),
            "[simulation]\nsettle_delay_ms = 50\n[inference]\nmodel = \"gemini-flash\"\n",
        )
        .unwrap();

        let manager = ConfigManager::with_config_dir(temp_dir.path()).await.unwrap();
        assert_eq!(manager.config().simulation.settle_delay, Duration::from_millis(50));
        assert_eq!(manager.config().inference.model, "gemini-flash");
    }

    #[tokio::test]
    async fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(ConfigPaths::CONFIG_FILE), "log_level = 7").unwrap();
        assert!(ConfigManager::with_config_dir(temp_dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_environment_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(ConfigPaths::CONFIG_FILE),
            "[inference]\nmodel = \"from-file\"\n",
        )
        .unwrap();
        let mut manager = ConfigManager::with_config_dir(temp_dir.path()).await.unwrap();

        manager.apply_env_overrides(env_from(&[
            (EnvVars::API_KEY_FALLBACK, "fallback-key"),
            (EnvVars::MODEL, "from-env"),
            (EnvVars::SINK_BEHAVIOR, "complete"),
            (EnvVars::LOG_LEVEL, "nonsense"),
        ]));

        let config = manager.config();
        assert_eq!(config.inference.model, "from-env");
        assert_eq!(config.inference.api_key.as_deref(), Some("fallback-key"));
        assert_eq!(config.simulation.sink_behavior, SinkBehavior::Complete);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[tokio::test]
    async fn test_primary_api_key_wins() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::with_config_dir(temp_dir.path()).await.unwrap();
        manager.apply_env_overrides(env_from(&[(EnvVars::API_KEY, "primary"), (EnvVars::API_KEY_FALLBACK, "fallback")]));
        assert_eq!(manager.config().inference.api_key.as_deref(), Some("primary"));
        assert!(manager.validate().is_valid());
        assert!(!manager.validate().has_issues());
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested");
        let mut manager = ConfigManager::with_config_dir(&dir).await.unwrap();
        manager.config_mut().simulation.step_delay = Duration::from_millis(10);
        manager.save().await.unwrap();

        let reloaded = ConfigManager::with_config_dir(&dir).await.unwrap();
        assert_eq!(reloaded.config().simulation.step_delay, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_validation() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::with_config_dir(temp_dir.path()).await.unwrap();
        let result = manager.validate();
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);

        manager.config_mut().inference.timeout = Duration::ZERO;
        assert!(!manager.validate().is_valid());
    }
}
