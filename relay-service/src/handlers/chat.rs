use crate::models::ChatResponse;
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;

/// `POST /chat`. The body is taken raw so that malformed JSON gets the same
/// 400 as a blank question instead of axum's extractor rejection.
pub async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.relay.handle_chat_request(&body).await?;
    Ok(Json(response))
}
