//! Ollama REST client (`/api/tags`, `/api/chat`)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ModelClient, ModelDirectory};
use crate::config::OllamaConfig;
use crate::dialogue::{Message, Role};
use crate::{Error, Result};

/// Response from `GET /api/tags`
#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Body of `POST /api/chat`
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from `POST /api/chat` with `stream: false`
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    role: Option<String>,
    content: String,
}

/// HTTP client for an Ollama-compatible server
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    /// Create a client for `base_url` (no trailing slash) completing with `model`
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            temperature: None,
        }
    }

    /// Create a client from loaded configuration
    #[must_use]
    pub fn from_config(config: OllamaConfig) -> Self {
        let mut client = Self::new(config.base_url, config.model);
        client.api_key = config.api_key;
        client.temperature = config.temperature;
        client
    }

    /// Set the sampling temperature sent with each completion
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Send a bearer key with every request
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Model used for completions
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Turn a non-2xx response into an error carrying the body
    async fn check_status(response: reqwest::Response, call: &str) -> Result<reqwest::Response> {
        let status = response.status();
        tracing::debug!(status = %status, call, "received response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, call, "ollama API error");
        Err(Error::Model(format!("ollama {call} error {status}: {body}")))
    }
}

#[async_trait]
impl ModelDirectory for OllamaClient {
    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        tracing::debug!(url = %url, "fetching model directory");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "model directory request failed");
                e
            })?;
        let response = Self::check_status(response, "tags").await?;

        let body = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Model(format!("malformed tags response: {e}")))?;

        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        if !names.iter().any(|n| n == &self.model) && !names.is_empty() {
            tracing::warn!(
                model = %self.model,
                available = ?names,
                "configured model is not in the server's directory"
            );
        }

        tracing::info!(count = names.len(), "model directory fetched");
        Ok(names)
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            messages,
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "requesting completion");

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "completion request failed");
                e
            })?;
        let response = Self::check_status(response, "chat").await?;

        let body = response.text().await?;
        let reply: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "failed to parse completion");
            Error::Model(format!("malformed chat response: {e}"))
        })?;

        if let Some(role) = reply.message.role.as_deref() {
            if role != Role::Assistant.as_str() {
                return Err(Error::Model(format!("unexpected reply role: {role}")));
            }
        }

        tracing::info!(reply_len = reply.message.content.len(), "completion received");
        Ok(reply.message.content)
    }
}
