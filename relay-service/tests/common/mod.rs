//! Shared helpers for relay-service integration tests.

#![allow(dead_code)]

use relay_service::config::{CorsConfig, KnowledgeConfig, ProviderConfig, RelayConfig};
use relay_service::services::providers::mock::MockCompletionProvider;
use relay_service::startup::{build_router, AppState};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_API_KEY: &str = "sk-test-key";
pub const FRONT_END_ORIGIN: &str = "https://front.example";

/// Config bound to a random port; `base_url` points at the fake upstream.
pub fn test_config(api_key: Option<&str>, base_url: &str) -> RelayConfig {
    RelayConfig {
        common: service_core::config::Config { port: 0 },
        provider: ProviderConfig {
            api_key: api_key.map(|k| SecretString::new(k.to_string())),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(2),
            ..ProviderConfig::default()
        },
        cors: CorsConfig {
            allowed_origins: vec![FRONT_END_ORIGIN.to_string()],
        },
        knowledge: KnowledgeConfig::default(),
    }
}

/// Router wired to `provider`, with or without a credential.
pub fn router_with(provider: Arc<MockCompletionProvider>, with_key: bool) -> axum::Router {
    let config = test_config(with_key.then_some(TEST_API_KEY), "http://unused.invalid");
    let state = AppState::new(config, provider).expect("Failed to build app state");
    build_router(state)
}

/// Router with a credential and an explicit CORS origin list.
pub fn router_with_origins(provider: Arc<MockCompletionProvider>, origins: &[&str]) -> axum::Router {
    let mut config = test_config(Some(TEST_API_KEY), "http://unused.invalid");
    config.cors.allowed_origins = origins.iter().map(|o| o.to_string()).collect();
    let state = AppState::new(config, provider).expect("Failed to build app state");
    build_router(state)
}
