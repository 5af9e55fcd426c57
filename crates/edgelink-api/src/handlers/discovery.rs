//! Discovery trigger endpoint.

use axum::extract::State;
use axum::http::StatusCode;

use edgelink_runtime::discovery;

use super::ServerState;

/// `POST /api/v1/discovery`: kick off an asynchronous discovery run.
/// Always acknowledged; an already-running discovery absorbs the trigger.
pub async fn discovery_handler(State(state): State<ServerState>) -> StatusCode {
    discovery::trigger(&state.svc);
    StatusCode::OK
}
