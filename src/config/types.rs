use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://circleci.com";

/// Version control system a CircleCI organization is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vcs {
    GitHub,
    Bitbucket,
}

impl Vcs {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vcs::GitHub => "github",
            Vcs::Bitbucket => "bitbucket",
        }
    }
}

impl FromStr for Vcs {
    type Err = ConfigError;

    /// Accepts `gh`, `github`, `bb` and `bitbucket`; matching is case-sensitive
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "gh" | "github" => Ok(Vcs::GitHub),
            "bb" | "bitbucket" => Ok(Vcs::Bitbucket),
            other => Err(ConfigError::InvalidVcs {
                vcs: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Vcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        crate::config::ConfigLoader::from_file(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        crate::config::ConfigLoader::validate_config_values(self)
    }
}

/// CircleCI API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Unset means the HTTP client's own defaults apply
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("checkout-key-rotator/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: None,
        }
    }
}

/// Where the old/new key logs are written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl OutputConfig {
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}
