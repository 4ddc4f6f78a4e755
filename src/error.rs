use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("rotation failed: {0}")]
    Rotation(#[from] RotationError),

    #[error("security error: {0}")]
    Security(#[from] SecurityError),
}

impl AppError {
    /// Message printed on stderr before the process exits
    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::Client(e) => e.user_friendly_message(),
            AppError::Rotation(RotationError::Client(e)) => e.user_friendly_message(),
            _ => self.to_string(),
        }
    }
}

/// Input validation errors
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("input validation failed: {message}")]
    InputValidationFailed { message: String },
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("invalid toml format: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("invalid vcs provided: {vcs}")]
    InvalidVcs { vcs: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors raised by the HTTP wrapper and the provider client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("incorrect and possibly insecure protocol in url: {url}")]
    InsecureUrl { url: String },

    #[error("invalid http method: {method}")]
    InvalidMethod { method: String },

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("malformed response body for {context}: {source}")]
    MalformedBody {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ClientError {
    /// Get a user-friendly error message for common transport failures
    pub fn user_friendly_message(&self) -> String {
        match self {
            ClientError::RequestFailed(e) => {
                let error_str = e.to_string().to_lowercase();
                if error_str.contains("connection refused") {
                    "connection refused - is the api url correct?".to_string()
                } else if error_str.contains("timeout") {
                    "request timeout - the api did not respond in time".to_string()
                } else if error_str.contains("tls") || error_str.contains("ssl") {
                    format!("TLS/SSL error - {e}")
                } else if error_str.contains("dns") || error_str.contains("name resolution") {
                    "DNS error - could not resolve api hostname".to_string()
                } else {
                    format!("network error - {e}")
                }
            }
            _ => self.to_string(),
        }
    }
}

/// Fatal workflow conditions; any of these aborts the whole run
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("error retrieving projects: status {status} ({body}) url: {url}")]
    ProjectListing { status: u16, body: String, url: String },

    #[error("no projects found in response")]
    MissingProjects,

    #[error("project name {project} is not found in list of projects")]
    ProjectNotFound { project: String },

    #[error("error getting ssh_keys: status {status} ({body}) url: {url}")]
    KeyListing { status: u16, body: String, url: String },

    #[error("error creating new checkout key: status {status} ({body}) url: {url}")]
    KeyCreation { status: u16, body: String, url: String },

    #[error("failed to record key for {project}: {source}")]
    Record {
        project: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Convenience type for Results
pub type Result<T> = std::result::Result<T, AppError>;
