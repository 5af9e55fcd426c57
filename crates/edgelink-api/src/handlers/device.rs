//! Device command endpoints: `/api/v1/device/{selector}/{command}`.
//!
//! Handlers are thin: selector extraction happens in the route, everything
//! else is the dispatcher. The scheduler shares that dispatcher, so these
//! handlers add no semantics of their own.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

use edgelink_runtime::command::{self, CommandMethod, DeviceSelector};

use super::{HandlerResult, ServerState};

/// `GET /api/v1/device/name/{name}/{cmd}`
pub async fn device_name_get_handler(
    State(state): State<ServerState>,
    Path((name, cmd)): Path<(String, String)>,
) -> HandlerResult<Json<Value>> {
    let body = command::execute(
        &state.svc,
        &DeviceSelector::Name(name),
        &cmd,
        CommandMethod::Get,
        None,
    )
    .await?;
    Ok(Json(body))
}

/// `PUT /api/v1/device/name/{name}/{cmd}`
pub async fn device_name_put_handler(
    State(state): State<ServerState>,
    Path((name, cmd)): Path<(String, String)>,
    body: String,
) -> HandlerResult<StatusCode> {
    command::execute(
        &state.svc,
        &DeviceSelector::Name(name),
        &cmd,
        CommandMethod::Put,
        Some(&body),
    )
    .await?;
    Ok(StatusCode::OK)
}

/// `GET /api/v1/device/id/{id}/{cmd}` and `GET /api/v1/device/{id}/{cmd}`
pub async fn device_id_get_handler(
    State(state): State<ServerState>,
    Path((id, cmd)): Path<(String, String)>,
) -> HandlerResult<Json<Value>> {
    let body = command::execute(
        &state.svc,
        &DeviceSelector::Id(id),
        &cmd,
        CommandMethod::Get,
        None,
    )
    .await?;
    Ok(Json(body))
}

/// `PUT /api/v1/device/id/{id}/{cmd}` and `PUT /api/v1/device/{id}/{cmd}`
pub async fn device_id_put_handler(
    State(state): State<ServerState>,
    Path((id, cmd)): Path<(String, String)>,
    body: String,
) -> HandlerResult<StatusCode> {
    command::execute(
        &state.svc,
        &DeviceSelector::Id(id),
        &cmd,
        CommandMethod::Put,
        Some(&body),
    )
    .await?;
    Ok(StatusCode::OK)
}

/// `GET /api/v1/device/all/{cmd}`
pub async fn device_all_get_handler(
    State(state): State<ServerState>,
    Path(cmd): Path<String>,
) -> HandlerResult<Json<Value>> {
    let body = command::execute(
        &state.svc,
        &DeviceSelector::All,
        &cmd,
        CommandMethod::Get,
        None,
    )
    .await?;
    Ok(Json(body))
}

/// `PUT /api/v1/device/all/{cmd}`
pub async fn device_all_put_handler(
    State(state): State<ServerState>,
    Path(cmd): Path<String>,
    body: String,
) -> HandlerResult<StatusCode> {
    command::execute(
        &state.svc,
        &DeviceSelector::All,
        &cmd,
        CommandMethod::Put,
        Some(&body),
    )
    .await?;
    Ok(StatusCode::OK)
}
