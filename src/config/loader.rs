use crate::config::types::Config;
use crate::error::ConfigError;
use crate::security::InputValidator;
use std::fs;
use tracing::{info, warn};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with path, content and value validation
    pub fn from_file(path: &str) -> Result<Config, ConfigError> {
        Self::validate_config_path(path)?;

        let content = fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read config file {}: {}", path, e);
            ConfigError::FileReadError(e)
        })?;

        Self::validate_config_content(&content)?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            warn!("Failed to parse TOML in {}: {}", path, e);
            ConfigError::TomlParseError(e)
        })?;

        Self::validate_config_values(&config)?;

        info!("Configuration loaded successfully from {}", path);
        Ok(config)
    }

    /// Validate configuration file path
    fn validate_config_path(path: &str) -> Result<(), ConfigError> {
        if path.contains("../") || path.contains("..\\") {
            warn!("Configuration path contains path traversal: {}", path);
            return Err(ConfigError::ValidationError {
                message: "configuration path contains path traversal sequences".to_string(),
            });
        }

        if path.contains('\0') || path.chars().any(|c| c.is_control()) {
            warn!("Configuration path contains invalid characters");
            return Err(ConfigError::ValidationError {
                message: "configuration path contains invalid characters".to_string(),
            });
        }

        if path.len() > 1024 {
            warn!("Configuration path too long: {} characters", path.len());
            return Err(ConfigError::ValidationError {
                message: format!("configuration path too long: {} characters", path.len()),
            });
        }

        Ok(())
    }

    /// Validate configuration file content before parsing
    fn validate_config_content(content: &str) -> Result<(), ConfigError> {
        // 1MB is far beyond any sane config for this tool
        if content.len() > 1024 * 1024 {
            warn!("Configuration file too large: {} bytes", content.len());
            return Err(ConfigError::ValidationError {
                message: format!("configuration file too large: {} bytes", content.len()),
            });
        }

        if content.contains('\0') {
            warn!("Configuration file contains binary data");
            return Err(ConfigError::ValidationError {
                message: "configuration file appears to contain binary data".to_string(),
            });
        }

        Ok(())
    }

    /// Validate the values of an already parsed configuration
    pub fn validate_config_values(config: &Config) -> Result<(), ConfigError> {
        let validator = InputValidator::default();

        validator
            .validate_url(&config.api.base_url)
            .map_err(|e| ConfigError::ValidationError {
                message: format!("invalid api base_url: {}", e),
            })?;

        if config.api.user_agent.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "api user_agent cannot be empty".to_string(),
            });
        }

        if config.api.timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "api timeout_secs must be greater than zero".to_string(),
            });
        }

        if config.output.directory.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "output directory cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
