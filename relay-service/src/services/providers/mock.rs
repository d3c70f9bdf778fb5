//! Mock provider implementation for testing.

use super::{
    ChatMessage, Completion, CompletionProvider, FinishReason, GenerationParams, ProviderError,
    Usage,
};
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted provider that records every call it receives.
pub struct MockCompletionProvider {
    reply: Result<String, ProviderError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(Vec<ChatMessage>, GenerationParams)>>,
}

impl MockCompletionProvider {
    /// Always answers with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(Ok(text.into()))
    }

    /// Always fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<String, ProviderError>) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages and parameters of the most recent call.
    pub fn last_request(&self) -> Option<(Vec<ChatMessage>, GenerationParams)> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Rough four-bytes-per-token estimate, saturating at `u32::MAX`.
fn estimate_tokens(text: &str) -> u32 {
    u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(
        &self,
        _credential: &SecretString,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some((messages.to_vec(), params.clone()));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = self.reply.clone()?;
        let input_tokens = messages
            .iter()
            .map(|m| estimate_tokens(&m.content))
            .fold(0u32, u32::saturating_add);

        Ok(Completion {
            usage: Some(Usage {
                input_tokens,
                output_tokens: estimate_tokens(&text),
            }),
            text,
            finish_reason: FinishReason::Complete,
        })
    }
}
