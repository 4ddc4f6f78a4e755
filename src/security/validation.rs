use crate::error::SecurityError;
use regex::Regex;
use std::collections::HashSet;

/// Validator for values that end up in API URL paths and log file names
pub struct InputValidator {
    max_segment_length: usize,
    max_token_length: usize,
    segment_pattern: Regex,
    allowed_schemes: HashSet<String>,
}

impl Default for InputValidator {
    fn default() -> Self {
        let mut allowed_schemes = HashSet::new();
        allowed_schemes.insert("https".to_string());
        allowed_schemes.insert("http".to_string());

        Self {
            max_segment_length: 256,
            max_token_length: 512,
            segment_pattern: Regex::new(r"^[A-Za-z0-9._-]+$").expect("static regex is valid"),
            allowed_schemes,
        }
    }
}

impl InputValidator {
    /// Validate an organization or project name used as a URL path segment
    pub fn validate_path_segment(&self, field: &str, value: &str) -> Result<(), SecurityError> {
        if value.is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: format!("{field} cannot be empty"),
            });
        }

        if value.len() > self.max_segment_length {
            return Err(SecurityError::InputValidationFailed {
                message: format!("{field} too long: {} characters", value.len()),
            });
        }

        if value == "." || value == ".." {
            return Err(SecurityError::InputValidationFailed {
                message: format!("{field} cannot be a relative path component"),
            });
        }

        if !self.segment_pattern.is_match(value) {
            return Err(SecurityError::InputValidationFailed {
                message: format!("invalid characters in {field}: {}", self.sanitize_log_input(value)),
            });
        }

        Ok(())
    }

    /// Validate an API token: non-empty, bounded, no whitespace or control characters
    pub fn validate_token(&self, token: &str) -> Result<(), SecurityError> {
        if token.is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: "token cannot be empty".to_string(),
            });
        }

        if token.len() > self.max_token_length {
            return Err(SecurityError::InputValidationFailed {
                message: format!("token too long: {} characters", token.len()),
            });
        }

        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SecurityError::InputValidationFailed {
                message: "token contains whitespace or control characters".to_string(),
            });
        }

        Ok(())
    }

    /// Validate URL scheme
    pub fn validate_scheme(&self, scheme: &str) -> Result<(), SecurityError> {
        if !self.allowed_schemes.contains(&scheme.to_ascii_lowercase()) {
            return Err(SecurityError::InputValidationFailed {
                message: format!("scheme '{}' is not allowed", scheme),
            });
        }

        Ok(())
    }

    /// Validate that a base URL has an allowed scheme and a host
    pub fn validate_url(&self, url: &str) -> Result<(), SecurityError> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            SecurityError::InputValidationFailed {
                message: format!("url '{}' has no scheme", self.sanitize_log_input(url)),
            }
        })?;

        self.validate_scheme(scheme)?;

        if rest.trim_matches('/').is_empty() {
            return Err(SecurityError::InputValidationFailed {
                message: "url has no host".to_string(),
            });
        }

        Ok(())
    }

    /// Strip non-ASCII and control characters from provider-supplied text before logging
    pub fn sanitize_log_input(&self, input: &str) -> String {
        input
            .chars()
            .filter(|c| c.is_ascii() && !c.is_control() || *c == ' ')
            .take(256)
            .collect()
    }
}
