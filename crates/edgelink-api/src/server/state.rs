//! Shared handler state.

use std::sync::Arc;

use edgelink_runtime::DeviceService;

/// State injected into every handler: the service instance.
#[derive(Clone)]
pub struct ServerState {
    pub svc: Arc<DeviceService>,
}

impl ServerState {
    pub fn new(svc: Arc<DeviceService>) -> Self {
        Self { svc }
    }
}
