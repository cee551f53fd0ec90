//! Completion API abstraction and implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::CompletionConfig;

pub mod chat;
pub mod inference;

/// Error types for completion calls
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimit { retry_after: Option<u64> },

    #[error("Invalid model: {model}")]
    InvalidModel { model: String },

    #[error("Request failed: {status}: {message}")]
    RequestFailed {
        status: u16,
        message: String,
        /// Structured error payload from the API, passed through to the UI
        details: Option<serde_json::Value>,
    },

    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Completion request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl LlmError {
    /// Human readable detail for error responses. Structured payloads are
    /// rendered as compact JSON.
    pub fn detail(&self) -> String {
        match self {
            Self::RequestFailed {
                details: Some(details),
                ..
            } => details.to_string(),
            other => other.to_string(),
        }
    }
}

/// Which wire format the completion API speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStyle {
    /// OpenAI compatible `/chat/completions`
    #[default]
    Chat,
    /// Legacy prompt completion: `{inputs, parameters}` in, `[{generated_text}]` out
    Inference,
}

/// Sampling parameters sent with every completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 250,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// Completion API seam. The chat service only needs "prompt in, text out".
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for logs (e.g., "chat", "inference")
    fn provider_name(&self) -> &str;

    /// Generate a reply for a fully assembled prompt
    async fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String, LlmError>;
}

/// Factory for creating completion providers from configuration
pub struct CompletionProviderFactory;

impl CompletionProviderFactory {
    /// Create the provider selected by `config.style`
    pub fn create_provider(
        config: &CompletionConfig,
        client: reqwest::Client,
        timeout_ms: u64,
    ) -> Result<Arc<dyn CompletionProvider>, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| LlmError::Authentication {
                message: "Completion API key not provided".to_string(),
            })?;

        match config.style {
            CompletionStyle::Chat => Ok(Arc::new(chat::ChatCompletionProvider::new(
                client,
                api_key,
                config.base_url.clone(),
                config.model.clone(),
                timeout_ms,
            ))),
            CompletionStyle::Inference => Ok(Arc::new(inference::InferenceProvider::new(
                client,
                api_key,
                config.base_url.clone(),
                timeout_ms,
            ))),
        }
    }
}

/// Parse standard HTTP error responses from a completion API
pub fn parse_http_error(status: u16, body: &str, model_name: Option<&str>) -> LlmError {
    let details = serde_json::from_str::<serde_json::Value>(body).ok();

    match status {
        429 => LlmError::RateLimit {
            retry_after: details.as_ref().and_then(extract_retry_after),
        },
        401 | 403 => LlmError::Authentication {
            message: "Invalid API key or insufficient permissions".to_string(),
        },
        400 | 404
            if body.contains("model")
                && (body.contains("not found") || body.contains("does not exist")) =>
        {
            LlmError::InvalidModel {
                model: model_name.unwrap_or("unknown").to_string(),
            }
        }
        _ => {
            let message = details
                .as_ref()
                .and_then(|json| {
                    json.pointer("/error/message")
                        .or_else(|| json.get("error"))
                        .or_else(|| json.get("message"))
                })
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| body.to_string());
            LlmError::RequestFailed {
                status,
                message,
                details,
            }
        }
    }
}

/// Map a reqwest failure, turning timeouts into `LlmError::Timeout`
pub fn map_transport_error(error: reqwest::Error, timeout_ms: u64) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout { timeout_ms }
    } else {
        LlmError::Network(error)
    }
}

/// Extract retry-after value from an error payload
fn extract_retry_after(json: &serde_json::Value) -> Option<u64> {
    json.get("retry_after")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|v| v.as_u64())
        })
}
