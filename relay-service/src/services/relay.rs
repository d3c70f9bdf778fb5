//! The relay: validate, assemble the prompt, call the provider, map the result.

use super::knowledge::KnowledgeBlock;
use super::metrics;
use super::prompt::PromptTemplate;
use super::providers::{CompletionProvider, GenerationParams, ProviderError};
use crate::config::{ProviderConfig, API_KEY_VAR};
use crate::models::{ChatResponse, Question};
use secrecy::SecretString;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Message returned for any request without a usable question.
pub const MISSING_QUESTION: &str = "Please provide a question.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Please provide a question.")]
    Validation,

    #[error("{0} environment variable is missing. Set it in the service environment.")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl RelayError {
    /// Metric label for the request outcome.
    fn outcome(&self) -> &'static str {
        match self {
            RelayError::Validation => "rejected",
            RelayError::MissingCredential(_) => "misconfigured",
            RelayError::Provider(_) => "failed",
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation => AppError::BadRequest(anyhow::anyhow!(MISSING_QUESTION)),
            RelayError::MissingCredential(_) => {
                AppError::ConfigError(anyhow::anyhow!(err.to_string()))
            }
            RelayError::Provider(e) => AppError::Upstream {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

/// Stateless per request; every field is read-only after construction.
pub struct RelayService {
    provider: Arc<dyn CompletionProvider>,
    credential: Option<SecretString>,
    template: PromptTemplate,
    params: GenerationParams,
    timeout: Duration,
}

impl RelayService {
    pub fn new(
        config: &ProviderConfig,
        knowledge: &KnowledgeBlock,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            provider,
            credential: config.api_key.clone(),
            template: PromptTemplate::new(knowledge),
            params: GenerationParams {
                model: config.model.clone(),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
            },
            timeout: config.timeout,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Full `/chat` pipeline over a raw request body.
    pub async fn handle_chat_request(&self, raw_body: &[u8]) -> Result<ChatResponse, RelayError> {
        let result = match Question::from_body(raw_body) {
            Some(question) => self.answer(&question).await,
            None => Err(RelayError::Validation),
        };

        match &result {
            Ok(_) => metrics::record_relay_request("answered"),
            Err(e) => metrics::record_relay_request(e.outcome()),
        }

        result.map(|answer| ChatResponse { answer })
    }

    /// Ask the provider one question; returns the trimmed answer.
    pub async fn answer(&self, question: &Question) -> Result<String, RelayError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(RelayError::MissingCredential(API_KEY_VAR))?;

        let messages = self.template.build(question);
        let provider = self.provider.name();
        let started = Instant::now();

        let result = tokio::time::timeout(
            self.timeout,
            self.provider.complete(credential, &messages, &self.params),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.timeout)));

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_provider_latency(provider, &self.params.model, elapsed);

        match result {
            Ok(completion) => {
                if let Some(usage) = completion.usage {
                    metrics::record_tokens(
                        &self.params.model,
                        usage.input_tokens,
                        usage.output_tokens,
                    );
                }
                tracing::info!(
                    provider,
                    model = %self.params.model,
                    finish_reason = completion.finish_reason.as_str(),
                    elapsed_secs = elapsed,
                    "Completion received"
                );
                Ok(completion.text.trim().to_string())
            }
            Err(e) => {
                metrics::record_provider_error(provider, e.kind());
                tracing::warn!(
                    provider,
                    model = %self.params.model,
                    error_kind = e.kind(),
                    error = %e,
                    elapsed_secs = elapsed,
                    "Completion failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockCompletionProvider;
    use crate::services::providers::Role;

    fn config(with_key: bool) -> ProviderConfig {
        ProviderConfig {
            api_key: with_key.then(|| SecretString::new("sk-test".to_string())),
            timeout: Duration::from_millis(200),
            ..ProviderConfig::default()
        }
    }

    fn relay(with_key: bool, provider: Arc<MockCompletionProvider>) -> RelayService {
        RelayService::new(&config(with_key), &KnowledgeBlock::builtin(), provider)
    }

    #[tokio::test]
    async fn answers_are_trimmed() {
        let provider = Arc::new(MockCompletionProvider::replying(
            "  Director of Warehousing at OB Streem \n",
        ));
        let response = relay(true, provider.clone())
            .handle_chat_request(br#"{"question": "What is his current role?"}"#)
            .await
            .unwrap();

        assert_eq!(response.answer, "Director of Warehousing at OB Streem");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_receives_prompt_and_bounded_params() {
        let provider = Arc::new(MockCompletionProvider::replying("ok"));
        relay(true, provider.clone())
            .handle_chat_request(br#"{"question": "  Where did he study?  "}"#)
            .await
            .unwrap();

        let (messages, params) = provider.last_request().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("KNOWLEDGE:"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Where did he study?");
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.max_tokens, 400);
    }

    #[tokio::test]
    async fn blank_question_never_reaches_provider() {
        let provider = Arc::new(MockCompletionProvider::replying("unused"));
        let err = relay(true, provider.clone())
            .handle_chat_request(br#"{"question": "   "}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Validation));
        assert_eq!(err.to_string(), MISSING_QUESTION);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn missing_credential_skips_provider() {
        let provider = Arc::new(MockCompletionProvider::replying("unused"));
        let err = relay(false, provider.clone())
            .handle_chat_request(br#"{"question": "Hi?"}"#)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::MissingCredential("OPENAI_API_KEY")));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider = Arc::new(
            MockCompletionProvider::replying("late").with_delay(Duration::from_secs(5)),
        );
        let err = relay(true, provider.clone())
            .handle_chat_request(br#"{"question": "Hi?"}"#)
            .await
            .unwrap_err();

        match err {
            RelayError::Provider(ProviderError::Timeout(limit)) => {
                assert_eq!(limit, Duration::from_millis(200))
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn provider_errors_map_to_upstream_with_kind() {
        let app_err: AppError = RelayError::Provider(ProviderError::NetworkError(
            "connection refused".to_string(),
        ))
        .into();
        assert_eq!(
            app_err.public_message(),
            "Server error: NetworkError: connection refused"
        );
    }
}
