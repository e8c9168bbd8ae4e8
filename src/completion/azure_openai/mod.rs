
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::{CompletionConfig, ConfigError};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Invalid completion configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("Request to completion endpoint failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("Completion endpoint returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to encode or decode completion payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Completion response contained no message content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
}

/// One entry of the message list sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ChatMessage {
    #[inline]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentPart::Text { text: text.into() }],
        }
    }

    #[inline]
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    #[inline]
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }
}

/// Fixed sampling settings applied to every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl From<&CompletionConfig> for DecodingParams {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stop: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Blocking client for an Azure OpenAI chat-completion deployment
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    url: Url,
    api_key: String,
    params: DecodingParams,
    agent: ureq::Agent,
}

impl ChatCompletionClient {
    #[inline]
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        config.validate()?;
        let url = config.chat_completions_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            url,
            api_key: config.api_key.clone(),
            params: DecodingParams::from(config),
            agent,
        })
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn params(&self) -> DecodingParams {
        self.params
    }

    /// Send one non-streaming completion request and return the first
    /// choice's text unmodified.
    #[inline]
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let request = ChatRequest {
            messages,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            top_p: self.params.top_p,
            frequency_penalty: self.params.frequency_penalty,
            presence_penalty: self.params.presence_penalty,
            stop: None,
            stream: false,
        };
        let request_json = serde_json::to_string(&request)?;

        debug!(
            "Sending completion request with {} messages to {}",
            messages.len(),
            self.url.path()
        );

        let mut response = self
            .agent
            .post(self.url.as_str())
            .header("api-key", self.api_key.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)?;

        let status = response.status().as_u16();
        let response_text = response.body_mut().read_to_string()?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorEnvelope>(&response_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(response_text);
            warn!("Completion request failed with HTTP {}", status);
            return Err(CompletionError::Status { status, message });
        }

        let chat_response: ChatResponse = serde_json::from_str(&response_text)?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}
