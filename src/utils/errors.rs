//! Error types used throughout the application

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for repochat
#[derive(Error, Debug)]
pub enum RepoChatError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Completion API error: {0}")]
    Llm(#[from] crate::llm::LlmError),

    /// Non-2xx answer from the source-hosting provider
    #[error("{message}")]
    Provider { status: u16, message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Failed to fetch {path}: {message}")]
    FileFetch { path: String, message: String },

    #[error("Timeout error: upstream call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Server error: {message}")]
    Server { message: String },

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration: {source}")]
    ReadError {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError {
        #[source]
        source: toml::ser::Error,
    },
}

impl RepoChatError {
    /// Build a provider error from a failed response.
    ///
    /// The provider's own `message` field wins; otherwise `fallback` is used so
    /// every endpoint surfaces something readable.
    pub fn from_provider_response(status: u16, body: &str, fallback: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(|m| m.as_str())
                    .map(|m| m.to_string())
            })
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());

        match status {
            401 => Self::authentication(message),
            _ => Self::provider(status, message),
        }
    }

    /// Map a transport error, turning reqwest timeouts into `Timeout`
    pub fn from_transport(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            Self::timeout(timeout_ms)
        } else {
            Self::Http(error)
        }
    }

    /// Create a new provider error
    pub fn provider<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S1: Into<String>, S2: Into<String>>(field: S1, message: S2) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new file fetch error
    pub fn file_fetch<S1: Into<String>, S2: Into<String>>(path: S1, message: S2) -> Self {
        Self::FileFetch {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Create a new server error
    pub fn server<S: Into<String>>(message: S) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Create a new unknown error
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// HTTP status the server answers with when this error ends a request
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Provider { status, .. } if (400..500).contains(status) => *status,
            Self::Provider { .. } => 502,
            Self::Authentication { .. } => 401,
            Self::Validation { .. } => 400,
            Self::Timeout { .. } => 504,
            Self::Llm(crate::llm::LlmError::Timeout { .. }) => 504,
            Self::Llm(_) | Self::FileFetch { .. } | Self::Http(_) => 502,
            _ => 500,
        }
    }

    /// Structured detail for the `details` field of an error response
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Llm(e) => Some(e.detail()),
            Self::FileFetch { .. } | Self::Timeout { .. } | Self::Http(_) => Some(self.to_string()),
            _ => None,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Llm(_) => "llm",
            Self::Provider { .. } => "provider",
            Self::Authentication { .. } => "auth",
            Self::Validation { .. } => "validation",
            Self::FileFetch { .. } => "file_fetch",
            Self::Timeout { .. } => "timeout",
            Self::Server { .. } => "server",
            Self::Json(_) => "json",
            Self::Http(_) => "http",
            Self::Base64(_) => "base64",
            Self::Url(_) => "url",
            Self::Io(_) => "io",
            Self::Unknown { .. } => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_wins_over_fallback() {
        let err = RepoChatError::from_provider_response(
            404,
            r#"{"message":"Not Found","documentation_url":"https://docs.github.com"}"#,
            "Failed to fetch repository files",
        );
        assert_eq!(err.to_string(), "Not Found");
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_fallback_used_for_unparseable_body() {
        let err = RepoChatError::from_provider_response(500, "<html>oops</html>", "Failed to fetch file content");
        assert_eq!(err.to_string(), "Failed to fetch file content");
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_unauthorized_maps_to_authentication() {
        let err = RepoChatError::from_provider_response(401, r#"{"message":"Bad credentials"}"#, "x");
        assert!(matches!(err, RepoChatError::Authentication { .. }));
        assert_eq!(err.category(), "auth");
    }

    #[test]
    fn test_timeout_status() {
        assert_eq!(RepoChatError::timeout(1000).status_code(), 504);
    }

    #[test]
    fn test_status_and_details_by_variant() {
        let fetch = RepoChatError::file_fetch("src/lib.rs", "path is a directory");
        assert_eq!(fetch.status_code(), 502);
        assert_eq!(fetch.category(), "file_fetch");
        assert_eq!(
            fetch.details().as_deref(),
            Some("Failed to fetch src/lib.rs: path is a directory")
        );

        let invalid = RepoChatError::validation("message", "Message must not be empty");
        assert_eq!(invalid.status_code(), 400);
        assert!(invalid.details().is_none());

        assert_eq!(RepoChatError::server("bad base URL").status_code(), 500);
        assert_eq!(RepoChatError::unknown("logger").category(), "unknown");
    }
}
