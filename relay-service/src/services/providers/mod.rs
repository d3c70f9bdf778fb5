//! Completion provider abstraction and implementations.
//!
//! The relay only needs one call shape: an ordered list of role-tagged
//! messages plus generation parameters in, one generated text out. Backends
//! implement [`CompletionProvider`]; the mock backs the tests.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{0}")]
    NetworkError(String),

    #[error("no response within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("provider returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("provider rate limit reached: {0}")]
    RateLimited(String),

    #[error("{0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Stable label for the failure class, used in error bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NetworkError(_) => "NetworkError",
            ProviderError::Timeout(_) => "Timeout",
            ProviderError::ApiError { .. } => "ApiError",
            ProviderError::RateLimited(_) => "RateLimited",
            ProviderError::MalformedResponse(_) => "MalformedResponse",
        }
    }
}

/// Role tag of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role-tagged prompt segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation parameters for a completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other => "other",
        }
    }
}

/// Successful provider result.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
}

/// A chat-completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short backend name for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Issue one completion request. Implementations never retry.
    async fn complete(
        &self,
        credential: &SecretString,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError>;
}
