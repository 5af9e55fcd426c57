//! Route table for the northbound API.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{basic, callback, device, discovery};

use super::state::ServerState;

/// Build the `/api/v1` router. Method mismatches on known paths yield 405.
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/v1/ping", get(basic::ping_handler))
        .route("/api/v1/config", get(basic::config_handler))
        .route("/api/v1/metrics", get(basic::metrics_handler))
        .route("/api/v1/discovery", post(discovery::discovery_handler))
        .route(
            "/api/v1/callback",
            post(callback::callback_post_handler)
                .put(callback::callback_put_handler)
                .delete(callback::callback_delete_handler),
        )
        .route(
            "/api/v1/device/all/:cmd",
            get(device::device_all_get_handler).put(device::device_all_put_handler),
        )
        .route(
            "/api/v1/device/name/:name/:cmd",
            get(device::device_name_get_handler).put(device::device_name_put_handler),
        )
        .route(
            "/api/v1/device/id/:id/:cmd",
            get(device::device_id_get_handler).put(device::device_id_put_handler),
        )
        .route(
            "/api/v1/device/:id/:cmd",
            get(device::device_id_get_handler).put(device::device_id_put_handler),
        )
        .with_state(state)
}
