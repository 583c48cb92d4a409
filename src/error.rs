// src/error.rs

//! Unified error handling for the link watcher.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport failed (timeout, DNS, connection refused)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Extraction pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Required configuration file is missing
    #[error("Configuration file not found: {}\nCreate it with the following shape:\n{shape}", .path.display())]
    ConfigNotFound { path: PathBuf, shape: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// The scrape target could not be fetched
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// No extraction strategy produced a domain
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The rule API answered with an error
    #[error("Rule API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    /// The configured rule id does not exist in any redirect rule-set
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Writing a source file failed mid-batch
    #[error("File error for {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Version-control step failed
    #[error("git {stage} failed: {message}")]
    Vcs { stage: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing-configuration error that names the expected shape.
    pub fn config_not_found(path: impl Into<PathBuf>, shape: impl Into<String>) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            shape: shape.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error with the target URL as context.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an extraction failure.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Create an application-level rule API error.
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a file write error for a specific path.
    pub fn file_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Create a version-control error for a stage (`add`, `commit`, `push`).
    pub fn vcs(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Vcs {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is a missing required configuration file.
    pub fn is_config_not_found(&self) -> bool {
        matches!(self, Self::ConfigNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_includes_status_when_present() {
        let err = AppError::api(Some(403), "Authentication error");
        assert_eq!(
            err.to_string(),
            "Rule API error (HTTP 403): Authentication error"
        );

        let err = AppError::api(None, "bad ruleset");
        assert_eq!(err.to_string(), "Rule API error: bad ruleset");
    }

    #[test]
    fn config_not_found_names_the_shape() {
        let err = AppError::config_not_found("storage/link_config.json", "{\"files\": []}");
        assert!(err.is_config_not_found());
        let message = err.to_string();
        assert!(message.contains("storage/link_config.json"));
        assert!(message.contains("\"files\""));
    }
}
