//! HTTP client configuration and management

use super::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::utils::errors::RepoChatError;
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub max_redirects: Option<usize>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            max_redirects: Some(10),
        }
    }
}

impl HttpClientConfig {
    /// Deadline in milliseconds, as reported by timeout errors
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Builder for HTTP client configuration
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper around reqwest::Client with shared configuration
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, RepoChatError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        if let Some(redirects) = config.max_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(redirects));
        }

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    /// Create a new HTTP client with default configuration
    pub fn with_defaults() -> Result<Self, RepoChatError> {
        Self::new(HttpClientConfig::default())
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = HttpClientBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.timeout_ms(), 5000);
        assert_eq!(config.user_agent.as_deref(), Some(super::super::DEFAULT_USER_AGENT));
        assert_eq!(config.max_redirects, Some(10));
    }

    #[test]
    fn test_default_client_builds() {
        let client = HttpClient::with_defaults().unwrap();
        assert_eq!(client.config().timeout, super::super::DEFAULT_TIMEOUT);
    }
}
