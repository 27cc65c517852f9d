use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LlmConfig;
use crate::errors::LlmError;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion from a single user prompt
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError>;
}

/// OpenAI API request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI-compatible chat completion provider
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: usize,
    temperature: f32,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client,
        })
    }

    fn build_request(&self, prompt: String) -> OpenAiRequest {
        OpenAiRequest {
            model: self.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    async fn call_openai(&self, request: &OpenAiRequest) -> Result<OpenAiResponse, LlmError> {
        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(status, &error_text));
        }

        response.json::<OpenAiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: &str) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
        _ => LlmError::ApiError(format!("HTTP {}: {}", status, body)),
    }
}

fn first_choice_content(response: OpenAiResponse) -> Result<String, LlmError> {
    response.choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?
        .message
        .content
        .ok_or_else(|| LlmError::InvalidResponse("Choice has no message content".to_string()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_completion(&self, prompt: String) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = self.build_request(prompt);
        let response = self.call_openai(&request).await?;

        if let Some(usage) = &response.usage {
            info!("LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                  usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
        }

        first_choice_content(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 150,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_request_has_single_user_message() {
        let provider = OpenAiProvider::new(&test_config()).unwrap();
        let request = provider.build_request("hello".to_string());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["max_tokens"], 150);
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
        assert!((value["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_endpoint_built_from_base_url() {
        let provider = OpenAiProvider::new(&test_config()).unwrap();
        assert_eq!(provider.endpoint, "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(status_error(StatusCode::UNAUTHORIZED, ""), LlmError::Unauthorized));
        assert!(matches!(status_error(StatusCode::TOO_MANY_REQUESTS, ""), LlmError::RateLimited));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            LlmError::ApiError(msg) if msg.contains("boom")
        ));
    }

    #[test]
    fn test_first_choice_content() {
        let response: OpenAiResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "- one\n- two"}}], "usage": null}"#,
        )
        .unwrap();
        assert_eq!(first_choice_content(response).unwrap(), "- one\n- two");
    }

    #[test]
    fn test_empty_choices_is_invalid_response() {
        let response: OpenAiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_choice_content(response), Err(LlmError::InvalidResponse(_))));
    }
}
