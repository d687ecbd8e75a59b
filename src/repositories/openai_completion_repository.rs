use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::{
    configuration::GenerationSettings,
    ports::completion_port::{
        CompletionError, CompletionPort, CompletionRequest, CompletionResponse, TokenUsage,
    },
};

/// Adapter for an OpenAI-compatible chat-completion API.
///
/// Configuration (model, token cap, temperature, timeout) is read once at
/// construction. Provider failures are classified here so the rest of the
/// pipeline never inspects provider-specific error shapes, and nothing is
/// retried: a failed call is terminal for the invocation.
pub struct OpenAiCompletionRepository {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiCompletionRepository {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings.timeout(),
        }
    }

    async fn send_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        let body = ChatCompletionBody {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_instruction,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                CompletionError::Failed(format!(
                    "Transport error calling the generation provider: {}",
                    error
                ))
            })?;

        let status = response.status();
        let payload = response.text().await.map_err(|error| {
            CompletionError::Failed(format!(
                "Failed to read the generation provider response: {}",
                error
            ))
        })?;

        if !status.is_success() {
            return Err(classify_provider_error(status, &payload));
        }

        let completion: ChatCompletionResponse =
            serde_json::from_str(&payload).map_err(|error| {
                CompletionError::Failed(format!(
                    "Failed to parse the generation provider response: {}",
                    error
                ))
            })?;

        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            CompletionError::Failed("The generation provider response is missing choices[0]".into())
        })?;
        let text = choice.message.content.ok_or_else(|| {
            CompletionError::Failed(
                "The generation provider response is missing content in choices[0]".into(),
            )
        })?;

        let usage = completion
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_default();

        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Completion call succeeded"
        );

        Ok(CompletionResponse { text, usage })
    }
}

#[async_trait]
impl CompletionPort for OpenAiCompletionRepository {
    #[tracing::instrument(
        name = "Calling generation provider",
        skip(self, request),
        fields(model = %self.model, max_tokens = self.max_tokens, temperature = self.temperature)
    )]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, CompletionError> {
        match tokio::time::timeout(self.timeout, self.send_completion(request)).await {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Maps a non-success provider response onto the completion error taxonomy.
///
/// 429 means two different things with an OpenAI-compatible API: a transient
/// rate limit, or an exhausted account quota reported with the
/// `insufficient_quota` error code.
fn classify_provider_error(status: StatusCode, payload: &str) -> CompletionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CompletionError::Authentication(format!(
                "the generation provider rejected the credentials ({})",
                status
            ))
        }
        StatusCode::TOO_MANY_REQUESTS if payload.contains("insufficient_quota") => {
            CompletionError::QuotaExhausted(payload.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimitExceeded(payload.to_string()),
        _ => CompletionError::Failed(format!(
            "the generation provider returned {}: {}",
            status, payload
        )),
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
