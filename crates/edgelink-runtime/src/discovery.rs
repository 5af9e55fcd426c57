//! Asynchronous device discovery.
//!
//! `POST /api/v1/discovery` (and the discovery schedule) trigger the
//! driver's `discover` on the worker pool. A guard mutex collapses
//! overlapping triggers: while one discovery run is in flight, further
//! triggers are acknowledged but not re-run.

use std::sync::Arc;

use tracing::{debug, info};

use crate::driver::DiscoveryContext;
use crate::service::DeviceService;

/// Kick off a discovery run. Returns `false` when one is already running
/// or the pool is shut down.
pub fn trigger(svc: &Arc<DeviceService>) -> bool {
    let guard = match svc.discovery_guard().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            debug!("discovery already in progress, ignoring trigger");
            return false;
        }
    };
    let driver = svc.driver();
    let ctx = DiscoveryContext::new(Arc::downgrade(svc));
    svc.pool().submit(async move {
        info!("starting device discovery");
        driver.discover(ctx).await;
        info!("device discovery finished");
        drop(guard);
    })
}
