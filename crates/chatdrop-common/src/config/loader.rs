use super::schema::ChatdropConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./chatdrop.yaml
    /// 2. ~/.chatdrop/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<ChatdropConfig, ConfigError> {
        let local_config = PathBuf::from("./chatdrop.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".chatdrop").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(ChatdropConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<ChatdropConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        // An empty file parses as YAML null; treat it as "all defaults".
        let config: ChatdropConfig = if content.trim().is_empty() {
            ChatdropConfig::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &ChatdropConfig) -> Result<(), ConfigError> {
        if config.target.urls.is_empty() {
            return Err(ConfigError::Invalid("target.urls must not be empty".into()));
        }
        if config.timing.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "timing.max_attempts must be at least 1".into(),
            ));
        }
        if config.locators.is_empty() {
            return Err(ConfigError::Invalid("locators must not be empty".into()));
        }
        Ok(())
    }
}
