//! Application startup and lifecycle management.
//!
//! Builds the shared state, the HTTP router and the listener for the relay.

use crate::config::{CorsConfig, RelayConfig};
use crate::handlers::{
    chat::chat,
    health::{health_check, index},
    metrics::metrics,
};
use crate::services::providers::openai::OpenAiProvider;
use crate::services::providers::CompletionProvider;
use crate::services::{KnowledgeBlock, RelayService};
use axum::{
    body::Body,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub relay: Arc<RelayService>,
}

impl AppState {
    /// Resolve the knowledge block and wire the relay around `provider`.
    pub fn new(config: RelayConfig, provider: Arc<dyn CompletionProvider>) -> Result<Self, AppError> {
        let knowledge = KnowledgeBlock::load(&config.knowledge)?;
        let relay = RelayService::new(&config.provider, &knowledge, provider);

        if !relay.has_credential() {
            tracing::warn!(
                "OPENAI_API_KEY is not set; /chat will answer 500 until it is configured"
            );
        }

        Ok(Self {
            config: Arc::new(config),
            relay: Arc::new(relay),
        })
    }
}

/// CORS for the browser front end. Unparseable origins are dropped; `*` allows any.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

/// Build the router. CORS applies to `/chat` only.
pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/chat", post(chat))
        .layer(cors_layer(&state.config.cors));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .merge(chat_routes)
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application against the configured OpenAI-compatible endpoint.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let provider = OpenAiProvider::new(&config.provider.base_url, config.provider.timeout)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        tracing::info!(
            model = %config.provider.model,
            base_url = %config.provider.base_url,
            timeout_secs = config.provider.timeout.as_secs(),
            "Initialized completion provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an arbitrary provider.
    pub async fn build_with_provider(
        config: RelayConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, AppError> {
        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let state = AppState::new(config, provider)?;

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Relay service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
