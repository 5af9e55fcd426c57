//! Embedded HTTP server.

pub mod router;
pub mod state;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{error, info};

use edgelink_core::SdkError;
use edgelink_runtime::{DeviceService, RestServer};

use router::create_router;
use state::ServerState;

/// Axum-backed implementation of the runtime's server collaborator.
///
/// `start` binds the configured port and serves until `stop`; each request
/// runs on its own task.
#[derive(Default)]
pub struct AxumRestServer {
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl AxumRestServer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RestServer for AxumRestServer {
    async fn start(&self, svc: Arc<DeviceService>, port: u16) -> Result<(), SdkError> {
        let router = create_router(ServerState::new(svc));
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        info!(port, "HTTP server listening");
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                error!(%err, "HTTP server terminated");
            }
        });
        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    async fn stop(&self) {
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
            info!("HTTP server stopped");
        }
    }
}
