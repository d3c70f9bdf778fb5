use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /`: plain-text liveness probe.
pub async fn index() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// `GET /health` for Docker/K8s probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "relay-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
