//! OpenAI-compatible LLM client
//!
//! Sends a single user message to `/chat/completions` and returns the first
//! choice. The client performs no retries and no model fallback; graph
//! synthesis decides what to do with a failed call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::chat::{ChatTurn, chat_messages};
use super::generator::TextGenerator;
use super::types::{ChatRequest, ChatResponse, FinishReason, Generation, Message};

/// Default endpoint (Volcano Ark, OpenAI-compatible)
pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// LLM client for chat completions
#[derive(Clone)]
pub struct LlmClient {
    /// HTTP client for making requests
    http_client: HttpClient,
    /// LLM configuration (model, temperature, etc.)
    config: LlmConfig,
    /// Model actually sent with each request
    model: String,
    /// API key for authentication
    api_key: String,
    /// Base URL for the API
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the configured base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Override the configured model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the LlmClient
    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url
        };

        let model = self.model.unwrap_or_else(|| config.resolved_model());

        Ok(LlmClient {
            http_client,
            config,
            model,
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    /// Create a new LlmClient with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    /// Create a client from configuration, reading the key from the environment
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .resolved_api_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .ok_or_else(|| {
                Error::LLMError(
                    "No API key found. Set INTERKNOW_API_KEY or VOLC_ARK_API_KEY".to_string(),
                )
            })?;
        Self::new(config.clone(), api_key)
    }

    /// Create a new builder for LlmClient
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Model sent with each request
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a chat completion request
    pub async fn complete(&self, messages: Vec<Message>) -> Result<Generation> {
        let request = ChatRequest::new(&self.model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        self.send_request(&request).await
    }

    /// Answer a chat message given the prior conversation
    pub async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<Generation> {
        let messages = chat_messages(message, history)?;
        info!(model = %self.model, turns = messages.len(), "Sending chat message");
        self.complete(messages).await
    }

    /// Send a single request to the API
    async fn send_request(&self, request: &ChatRequest) -> Result<Generation> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        let (generation, finish_reason) = Generation::from_chat_response(chat_response);
        if finish_reason == Some(FinishReason::Length) {
            warn!(
                model = %request.model,
                "Completion stopped at max_tokens; output may be truncated"
            );
        }

        debug!(
            model = %request.model,
            tokens = generation.usage.total(),
            chars = generation.text.chars().count(),
            "Chat completion received"
        );

        Ok(generation)
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(Error::LLMError(
                "Unauthorized: Invalid API key. Set INTERKNOW_API_KEY or VOLC_ARK_API_KEY environment variable.".to_string(),
            )),
            429 => Err(Error::LLMError(format!("Rate limited: {}", body))),
            400 => Err(Error::LLMError(format!("Bad request: {}", body))),
            403 => Err(Error::LLMError(format!("Forbidden: {}", body))),
            404 => Err(Error::LLMError(format!(
                "Model not found or endpoint unavailable: {}",
                body
            ))),
            500..=599 => Err(Error::LLMError(format!("Server error ({}): {}", status, body))),
            _ => Err(Error::LLMError(format!("HTTP error {}: {}", status, body))),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.complete(vec![Message::user(prompt)]).await
    }
}
