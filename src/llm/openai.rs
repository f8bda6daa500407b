//! OpenAI-compatible client implementation
//!
//! Async HTTP client for any endpoint speaking the OpenAI chat/completions
//! protocol (llama.cpp server, vLLM, OpenAI itself). When the chat endpoint
//! is unavailable the client falls back to the legacy completions endpoint
//! with a role-prefixed prompt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, Message, Result, RlmError};
use crate::llm::traits::{GenerateOptions, LlmProvider, LlmResponse, TokenUsage};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    debug: bool,
}

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

/// Legacy completion request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<String>,
}

/// Response shared by both endpoints
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

/// One choice from either endpoint shape
#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}

/// Models list response, accepting the shapes different servers emit
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelsResponse {
    Data { data: Vec<ModelInfo> },
    Models { models: Vec<ModelInfo> },
    Bare(Vec<ModelInfo>),
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.endpoint.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.endpoint.base_url.clone(),
            api_key: Config::api_key(),
            debug: config.agent.debug,
        }
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            api_key: Config::api_key(),
            debug: false,
        }
    }

    /// Debug print if enabled
    fn debug_print(&self, label: &str, content: &str) {
        if self.debug {
            if content.len() > 500 {
                eprintln!("DEBUG {}: {}...", label, &content[..500]);
            } else {
                eprintln!("DEBUG {}: {}", label, content);
            }
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Flatten messages into a role-prefixed prompt for the legacy endpoint
    fn flatten_messages(messages: &[Message]) -> String {
        let mut prompt = String::new();
        for msg in messages {
            let role = match msg.role.as_str() {
                "system" => "System",
                "assistant" => "Assistant",
                _ => "User",
            };
            prompt.push_str(&format!("{}: {}\n", role, msg.content));
        }
        prompt.push_str("Assistant: ");
        prompt
    }

    fn extract_content(response: CompletionResponse, requested_model: &str) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RlmError::endpoint("Response contained no choices"))?;

        let content = if let Some(message) = choice.message {
            message.content
        } else if let Some(text) = choice.text {
            text
        } else {
            return Err(RlmError::endpoint("Unexpected response choice format"));
        };

        let usage = response.usage.and_then(|u| {
            let prompt_tokens = u.prompt_tokens?;
            let completion_tokens = u.completion_tokens?;
            Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: u
                    .total_tokens
                    .unwrap_or(prompt_tokens + completion_tokens),
            })
        });

        Ok(LlmResponse {
            content,
            usage,
            model: response.model.unwrap_or_else(|| requested_model.to_string()),
        })
    }

    /// Try the chat completions endpoint; Ok(None) means "fall back"
    async fn try_chat_completions(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<Option<LlmResponse>> {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens.unwrap_or(1000),
            temperature: options.temperature.unwrap_or(0.7),
            stop: options.stop.clone(),
        };

        let request_json = serde_json::to_string(&request)?;
        self.debug_print("Chat request", &request_json);

        let response = self
            .authorize(
                self.client
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RlmError::endpoint(format!(
                        "Cannot connect to model endpoint at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    RlmError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            self.debug_print(
                "Chat completions failed",
                &format!("{}: {}", status, error_text),
            );
            // Fall through to the legacy completions endpoint
            return Ok(None);
        }

        let response_text = response.text().await?;
        self.debug_print("Chat response", &response_text);

        let parsed: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RlmError::endpoint(format!("Failed to parse response: {}", e)))?;

        Self::extract_content(parsed, model).map(Some)
    }

    /// Legacy completions endpoint with role-prefixed prompt
    async fn completions_fallback(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerateOptions,
    ) -> Result<LlmResponse> {
        let request = CompletionRequest {
            model,
            prompt: Self::flatten_messages(messages),
            max_tokens: options.max_tokens.unwrap_or(1000),
            temperature: options.temperature.unwrap_or(0.7),
            stop: options
                .stop
                .clone()
                .unwrap_or_else(|| vec!["User:".to_string(), "Assistant:".to_string()]),
        };

        let request_json = serde_json::to_string(&request)?;
        self.debug_print("Completions request", &request_json);

        let response = self
            .authorize(self.client.post(format!("{}/completions", self.base_url)))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RlmError::endpoint(format!(
                        "Cannot connect to model endpoint at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    RlmError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RlmError::endpoint(format!(
                "API request failed ({}): {}",
                status, error_text
            )));
        }

        let response_text = response.text().await?;
        self.debug_print("Completions response", &response_text);

        let parsed: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RlmError::endpoint(format!("Failed to parse response: {}", e)))?;

        Self::extract_content(parsed, model)
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LlmResponse> {
        let options = options.unwrap_or_default();

        if let Some(response) = self.try_chat_completions(model, messages, &options).await? {
            return Ok(response);
        }

        self.completions_fallback(model, messages, &options).await
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .authorize(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    RlmError::endpoint(format!(
                        "Cannot connect to model endpoint at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    RlmError::from(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(RlmError::endpoint(format!(
                "Failed to list models: {}",
                response.status()
            )));
        }

        let models_response: ModelsResponse = response.json().await?;
        let infos = match models_response {
            ModelsResponse::Data { data } => data,
            ModelsResponse::Models { models } => models,
            ModelsResponse::Bare(models) => models,
        };

        Ok(infos
            .into_iter()
            .filter_map(|m| m.id.or(m.model))
            .collect())
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::with_base_url("http://localhost:8080/v1");
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_flatten_messages() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let prompt = OpenAiClient::flatten_messages(&messages);
        assert!(prompt.starts_with("System: You are helpful\n"));
        assert!(prompt.contains("User: hi\n"));
        assert!(prompt.ends_with("Assistant: "));
    }

    #[test]
    fn test_extract_chat_shape() {
        let raw = r#"{"choices":[{"message":{"content":"hi"}}],"model":"m","usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let response = OpenAiClient::extract_content(parsed, "m").unwrap();
        assert_eq!(response.content, "hi");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_extract_legacy_shape() {
        let raw = r#"{"choices":[{"text":"hi"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        let response = OpenAiClient::extract_content(parsed, "m").unwrap();
        assert_eq!(response.content, "hi");
        assert!(response.usage.is_none());
        assert_eq!(response.model, "m");
    }

    #[test]
    fn test_models_response_shapes() {
        let data: ModelsResponse = serde_json::from_str(r#"{"data":[{"id":"a"}]}"#).unwrap();
        assert!(matches!(data, ModelsResponse::Data { .. }));
        let models: ModelsResponse =
            serde_json::from_str(r#"{"models":[{"model":"b"}]}"#).unwrap();
        assert!(matches!(models, ModelsResponse::Models { .. }));
        let bare: ModelsResponse = serde_json::from_str(r#"[{"id":"c"}]"#).unwrap();
        assert!(matches!(bare, ModelsResponse::Bare(_)));
    }
}
