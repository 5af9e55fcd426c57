//! Platform metadata callback endpoint.

use axum::extract::State;
use axum::http::StatusCode;

use edgelink_core::models::CallbackPayload;
use edgelink_core::SdkError;
use edgelink_runtime::callback::{self, CallbackMethod};

use super::{HandlerResult, ServerState};

/// Body parsing is manual so that an unknown entity type is a 400 rather
/// than a serde rejection status.
fn parse_payload(body: &str) -> Result<CallbackPayload, SdkError> {
    serde_json::from_str(body).map_err(|e| SdkError::InvalidArg(format!("callback body: {e}")))
}

/// `POST /api/v1/callback`
pub async fn callback_post_handler(
    State(state): State<ServerState>,
    body: String,
) -> HandlerResult<StatusCode> {
    let payload = parse_payload(&body)?;
    callback::apply(&state.svc, CallbackMethod::Post, &payload).await?;
    Ok(StatusCode::OK)
}

/// `PUT /api/v1/callback`
pub async fn callback_put_handler(
    State(state): State<ServerState>,
    body: String,
) -> HandlerResult<StatusCode> {
    let payload = parse_payload(&body)?;
    callback::apply(&state.svc, CallbackMethod::Put, &payload).await?;
    Ok(StatusCode::OK)
}

/// `DELETE /api/v1/callback`
pub async fn callback_delete_handler(
    State(state): State<ServerState>,
    body: String,
) -> HandlerResult<StatusCode> {
    let payload = parse_payload(&body)?;
    callback::apply(&state.svc, CallbackMethod::Delete, &payload).await?;
    Ok(StatusCode::OK)
}
