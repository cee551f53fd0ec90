//! OpenAI compatible chat-completions provider

use super::{map_transport_error, parse_http_error, CompletionProvider, LlmError, SamplingParams};
use crate::utils::http::HeaderBuilder;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default endpoint when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions provider (`POST {base}/chat/completions`)
pub struct ChatCompletionProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionProvider {
    /// Create a new chat-completions provider
    pub fn new(
        client: Client,
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            timeout_ms,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionProvider {
    fn provider_name(&self) -> &str {
        "chat"
    }

    async fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        let headers = HeaderBuilder::new()
            .json_content_type()
            .bearer_auth(&self.api_key)
            .map_err(|_| LlmError::Authentication {
                message: "API key contains characters not allowed in a header".to_string(),
            })?
            .build();

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout_ms))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status, &body, Some(&self.model)));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| LlmError::InvalidResponse {
            message: format!("Failed to parse chat completion response: {}", e),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "No choices in response".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let params = SamplingParams::default();
        let body = ChatRequest {
            model: "zephyr-7b",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "zephyr-7b");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 250);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Hello there."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hello there."));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = ChatCompletionProvider::new(
            Client::new(),
            "key".to_string(),
            Some("http://localhost:8080/v1/".to_string()),
            "m".to_string(),
            1000,
        );
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
