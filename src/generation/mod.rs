//! Generative-language backend client
//!
//! The pipeline only needs "messages in, reply text out", expressed as the
//! [`GenerationBackend`] trait so tests can substitute a scripted backend.
//! The shipped implementation talks to any OpenAI-compatible
//! `/chat/completions` endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AriaError, Result};
use crate::persona::PromptMessage;

/// A black-box text generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate one reply for the assembled prompt. Failures propagate:
    /// classification cannot proceed without a reply to parse.
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String>;
}

/// Configuration for the OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model_id: String,
    pub api_key: Option<String>,
}

impl GenerationConfig {
    /// Read config from the environment. Returns `None` when the base URL
    /// or model id is unset.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("BASE_AI_URL").ok()?;
        let model_id = std::env::var("CHAT_MODEL_ID").ok()?;
        Some(Self {
            base_url,
            model_id,
            api_key: std::env::var("AI_API_KEY").ok(),
        })
    }
}

/// Client for OpenAI-compatible chat-completion endpoints
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    config: GenerationConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Option<Self> {
        GenerationConfig::from_env().map(Self::new)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: String,
}

#[async_trait]
impl GenerationBackend for OpenAiCompatClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String> {
        let payload = json!({
            "model": self.config.model_id,
            "messages": messages,
        });

        let mut request = self.client.post(self.endpoint()).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AriaError::Generation(format!(
                "backend returned {}",
                response.status()
            )));
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AriaError::Generation("backend returned no choices".to_string()))
    }
}
