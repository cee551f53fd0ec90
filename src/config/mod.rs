//! Configuration management for repochat
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables, environment taking precedence.

use crate::llm::{CompletionStyle, SamplingParams};
use crate::utils::errors::{ConfigError, RepoChatError};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Source-hosting provider (GitHub) settings
    pub github: GithubConfig,
    /// Completion API settings
    pub completion: CompletionConfig,
    /// Prompt assembly and reply formatting
    pub chat: ChatConfig,
    /// Outbound HTTP settings
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Production mode (`NODE_ENV=production`)
    pub production: bool,
    /// Base URL the server is reachable at, used for the OAuth redirect
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// REST API root
    pub api_base_url: String,
    /// Web root hosting `/login/oauth/*`
    pub oauth_base_url: String,
    /// OAuth scope requested at authorize time
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub style: CompletionStyle,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// What to do when some selected files cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFetchPolicy {
    /// Any failed file fails the whole chat request
    FailAll,
    /// Drop failed files and continue with the rest
    SkipFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Characters of each file included in the prompt
    pub max_file_chars: usize,
    pub truncation_marker: String,
    /// Question/answer exchanges kept per session
    pub history_turns: usize,
    /// Sessions with stored history; the least recently active is dropped first
    pub max_sessions: usize,
    /// Characters that end a sentence when followed by whitespace
    pub sentence_terminators: Vec<char>,
    /// Sentences this short or shorter are dropped from the bullet list
    pub min_bullet_len: usize,
    pub partial_fetch: PartialFetchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Deadline for every outbound call
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            production: false,
            public_url: None,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.github.com".to_string(),
            oauth_base_url: "https://github.com".to_string(),
            scope: "repo".to_string(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        let sampling = SamplingParams::default();
        Self {
            style: CompletionStyle::Chat,
            api_key: None,
            base_url: None,
            model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_file_chars: 1000,
            truncation_marker: "... (truncated)".to_string(),
            history_turns: 20,
            max_sessions: 1000,
            sentence_terminators: vec!['.', '!', '?'],
            min_bullet_len: 5,
            partial_fetch: PartialFetchPolicy::FailAll,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl CompletionConfig {
    /// Sampling parameters for completion requests
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            ..SamplingParams::default()
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Environment variables read on top of the file, first match wins per key
const ENV_PORT: &[&str] = &["PORT"];
const ENV_NODE_ENV: &[&str] = &["NODE_ENV"];
const ENV_GITHUB_CLIENT_ID: &[&str] = &["GITHUB_CLIENT_ID"];
const ENV_GITHUB_CLIENT_SECRET: &[&str] = &["GITHUB_CLIENT_SECRET"];
const ENV_COMPLETION_KEY: &[&str] = &["OPEN_API_KEY", "COMPLETION_API_KEY"];
const ENV_COMPLETION_BASE_URL: &[&str] = &["BASE_URL", "COMPLETION_BASE_URL"];
const ENV_COMPLETION_MODEL: &[&str] = &["model", "COMPLETION_MODEL"];
const ENV_PUBLIC_URL: &[&str] = &["PUBLIC_URL"];

/// Configuration manager for loading and validating configuration
pub struct ConfigManager {
    config: Config,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration from `path` (or the default location) and the process environment
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load configuration using `env` as the environment lookup
    pub fn load_with_env<F>(path: Option<PathBuf>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, config_path) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound { path }.into());
                }
                (Self::load_config(&path)?, Some(path))
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => (Self::load_config(&path)?, Some(path)),
                _ => (Config::default(), None),
            },
        };

        config.apply_env(env)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the manager, keeping the configuration
    pub fn into_config(self) -> Config {
        self.config
    }

    /// File the configuration was read from, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Default configuration file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("repochat").join("config.toml"))
    }

    /// Load configuration from file
    fn load_config(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError { source: e })?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError { source: e })
            .map_err(Into::into)
    }
}

impl Config {
    /// Apply environment overrides
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| env(key).filter(|value| !value.trim().is_empty()))
        };

        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(node_env) = lookup(ENV_NODE_ENV) {
            self.server.production = node_env == "production";
        }
        if let Some(public_url) = lookup(ENV_PUBLIC_URL) {
            self.server.public_url = Some(public_url);
        }
        if let Some(client_id) = lookup(ENV_GITHUB_CLIENT_ID) {
            self.github.client_id = Some(client_id);
        }
        if let Some(secret) = lookup(ENV_GITHUB_CLIENT_SECRET) {
            self.github.client_secret = Some(secret);
        }
        if let Some(api_key) = lookup(ENV_COMPLETION_KEY) {
            self.completion.api_key = Some(api_key);
        }
        if let Some(base_url) = lookup(ENV_COMPLETION_BASE_URL) {
            self.completion.base_url = Some(base_url);
        }
        if let Some(model) = lookup(ENV_COMPLETION_MODEL) {
            self.completion.model = model;
        }

        Ok(())
    }

    /// Check that the configuration can serve requests
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.missing_credentials().first() {
            return Err(RepoChatError::validation(
                *key,
                format!("No value configured for '{}'", key),
            ));
        }

        if self.chat.sentence_terminators.is_empty() {
            return Err(RepoChatError::validation(
                "chat.sentence_terminators",
                "At least one sentence terminator is required",
            ));
        }

        if self.chat.max_sessions == 0 {
            return Err(RepoChatError::validation(
                "chat.max_sessions",
                "At least one session must be kept",
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(RepoChatError::validation(
                "http.timeout_secs",
                "Outbound timeout must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Credentials needed at runtime that are not set
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.github.client_id) {
            missing.push("github.client_id");
        }
        if is_blank(&self.github.client_secret) {
            missing.push("github.client_secret");
        }
        if is_blank(&self.completion.api_key) {
            missing.push("completion.api_key");
        }
        missing
    }

    /// Copy with secrets masked, for display
    pub fn masked(&self) -> Config {
        let mut masked = self.clone();
        masked.github.client_secret = masked.github.client_secret.as_deref().map(mask);
        masked.completion.api_key = masked.completion.api_key.as_deref().map(mask);
        masked
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError { source: e })
            .map_err(Into::into)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}
