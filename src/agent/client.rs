//! Chat completion client for OpenAI-compatible APIs (OpenRouter by default)

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::agent::types::*;
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// A chat completion backend
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Model identifier used for requests
    fn model(&self) -> &str;

    /// Run one completion. `tools` empty means no tool use is offered;
    /// otherwise `options.tool_choice` says whether the model may call them.
    async fn complete(
        &self,
        messages: Vec<Turn>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse>;
}

/// HTTP chat completion client
#[derive(Clone)]
pub struct CompletionClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl CompletionClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.expose_secret().is_empty() {
            return Err(Error::Config("LLM API key is not set".to_string()));
        }

        let mut headers = header::HeaderMap::new();

        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!(
                "Bearer {}",
                config.api_key.expose_secret()
            ))
            .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );
        headers.insert("X-Title", header::HeaderValue::from_static("SearchAgent"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(CompletionClient { client, config })
    }

    /// Default generation options from config
    pub fn default_options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            tool_choice: ToolChoice::Auto,
        }
    }

    /// Send a request to the completions endpoint
    async fn send_request(&self, request: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!(
            "Sending completion request: model={}, messages={}, tools={}",
            request.model,
            request.messages.len(),
            request.tools.as_ref().map_or(0, |t| t.len())
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_request("LLM request failed", e))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| Error::from_request("Invalid LLM response", e))?;

            if let Some(ref usage) = body.usage {
                info!(
                    "LLM response: model={}, tokens={}",
                    body.model, usage.total_tokens
                );
            }

            Ok(body)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Err(Error::RateLimit(error_text))
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(Error::Unauthorized("Invalid API key".to_string()))
                }
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                    Err(Error::Timeout(format!("LLM provider returned {}", status)))
                }
                _ => Err(Error::Provider(format!(
                    "API error ({}): {}",
                    status, error_text
                ))),
            }
        }
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        messages: Vec<Turn>,
        tools: Vec<ToolDefinition>,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools), Some(options.tool_choice))
        };

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools,
            tool_choice,
        };

        self.send_request(request).await
    }
}
