//! OpenAI chat-completions provider.
//!
//! Speaks the `/chat/completions` wire format, so any compatible endpoint can
//! be targeted through `OPENAI_BASE_URL`.

use super::{
    ChatMessage, Completion, CompletionProvider, FinishReason, GenerationParams, ProviderError,
    Usage,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on how much of an unparseable error body is echoed back.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// OpenAI-compatible completion provider with a pooled HTTP client.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        credential: &SecretString,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        let request = ChatCompletionRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            model = %params.model,
            message_count = messages.len(),
            "Sending request to completions API"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(credential.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Err(error_from_status(status, &body));
        }

        let api_response: ChatCompletionResponse = serde_json::from_slice(&body).map_err(|e| {
            ProviderError::MalformedResponse(format!("failed to decode completion: {}", e))
        })?;

        completion_from_response(api_response)
    }
}

fn error_from_status(status: StatusCode, body: &[u8]) -> ProviderError {
    let message = serde_json::from_slice::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| {
            let raw = String::from_utf8_lossy(body);
            let raw = raw.trim();
            if raw.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                raw.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        });

    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::RateLimited(message);
    }

    ProviderError::ApiError {
        status: status.as_u16(),
        message,
    }
}

fn completion_from_response(response: ChatCompletionResponse) -> Result<Completion, ProviderError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        ProviderError::MalformedResponse("completion contained no choices".to_string())
    })?;

    let text = choice
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::MalformedResponse("completion contained no message content".to_string())
        })?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => FinishReason::Complete,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
    };

    Ok(Completion {
        text,
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
        finish_reason,
    })
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
