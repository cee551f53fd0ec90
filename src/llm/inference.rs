//! Legacy prompt-completion provider (text-generation-inference style)
//!
//! Request: `{"inputs": prompt, "parameters": {max_new_tokens, temperature, top_p, do_sample}}`
//! Response: `[{"generated_text": "..."}]` or `{"generated_text": "..."}`.

use super::{map_transport_error, parse_http_error, CompletionProvider, LlmError, SamplingParams};
use crate::utils::http::HeaderBuilder;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

pub struct InferenceProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    temperature: f32,
    top_p: f32,
    do_sample: bool,
    return_full_text: bool,
}

impl InferenceProvider {
    pub fn new(client: Client, api_key: String, base_url: Option<String>, timeout_ms: u64) -> Self {
        Self {
            client,
            api_key,
            endpoint: base_url.unwrap_or_default(),
            timeout_ms,
        }
    }
}

/// Pull the generated text out of either response shape
fn extract_generated_text(body: &serde_json::Value) -> Option<String> {
    let item = match body {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    item.get("generated_text")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[async_trait]
impl CompletionProvider for InferenceProvider {
    fn provider_name(&self) -> &str {
        "inference"
    }

    async fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String, LlmError> {
        if self.endpoint.is_empty() {
            return Err(LlmError::Unknown {
                message: "Inference endpoint (base_url) not configured".to_string(),
            });
        }

        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                do_sample: true,
                return_full_text: false,
            },
        };

        let headers = HeaderBuilder::new()
            .json_content_type()
            .bearer_auth(&self.api_key)
            .map_err(|_| LlmError::Authentication {
                message: "API key contains characters not allowed in a header".to_string(),
            })?
            .build();

        debug!(prompt_chars = prompt.len(), "sending prompt completion");

        let response = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_ms))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body, None));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| LlmError::InvalidResponse {
            message: format!("Failed to parse generation response: {}", e),
        })?;

        extract_generated_text(&json).ok_or_else(|| LlmError::InvalidResponse {
            message: "Expected 'generated_text' in response".to_string(),
        })
    }
}
