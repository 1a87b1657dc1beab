use crate::config::{CompletionSettings, Config};
use crate::error::CompletionError;
use crate::events::CompletionTurn;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Duration;

/// Request to send to the completion service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<CompletionTurn>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<CompletionTurn>, settings: &CompletionSettings) -> Self {
        Self {
            model: settings.model.clone(),
            messages,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }
}

/// Content of the first returned choice, if the service produced any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
    pub content: Option<String>,
}

#[cfg(test)]
impl CompletionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()) }
    }

    pub fn empty() -> Self {
        Self { content: None }
    }
}

/// Anything that can answer a completion request.
///
/// One call per request, no retries.
pub trait CompletionBackend {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionReply, CompletionError>> + Send;
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Parse an OpenAI-compatible chat completion body.
///
/// Only the first choice is consumed. A body without any choice is malformed;
/// a choice with null content is a reply without content.
pub fn parse_completion(body: &str) -> Result<CompletionReply, CompletionError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Malformed(e.to_string()))?;

    let first = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Malformed("response has no choices".to_string()))?;

    Ok(CompletionReply { content: first.message.content })
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            provider_name: config.provider.name.clone(),
            base_url: config.provider.base_url.trim_end_matches('/').to_string(),
            api_key: config.get_api_key(),
            api_key_env: config.provider.api_key_env.clone(),
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionReply, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| CompletionError::MissingApiKey {
            env_var: self.api_key_env.clone(),
        })?;

        tracing::debug!(
            provider = %self.provider_name,
            model = %request.model,
            turns = request.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::Status { status: status.as_u16(), body });
        }

        parse_completion(&body)
    }
}
