//! HTTP handlers, organized by endpoint group.

pub mod basic;
pub mod callback;
pub mod device;
pub mod discovery;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use edgelink_core::SdkError;

pub use crate::server::state::ServerState;

/// Runtime error adapted to an HTTP response: the status comes from the
/// error kind, the body carries the message.
pub struct ApiError(pub SdkError);

impl From<SdkError> for ApiError {
    fn from(err: SdkError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type HandlerResult<T> = Result<T, ApiError>;
