//! Event construction and asynchronous posting.
//!
//! Readings built from driver results are wrapped into one event per
//! device and handed to the worker pool for posting; the originating HTTP
//! response never waits for the data service. Post failures are logged and
//! dropped; delivery is at most once, with no local spooling.

use std::sync::Arc;

use tracing::{debug, error};

use edgelink_core::models::{now_ms, Event, Reading};
use edgelink_core::{DeviceValue, SdkError};

use crate::clients::DataClient;
use crate::driver::{CommandRequest, CommandResult};
use crate::pool::WorkerPool;
use crate::transform;

/// Build readings from driver results, applying outgoing transforms,
/// assertions and enumeration mappings. Results arrive in request order
/// and readings are emitted in the same order.
///
/// An assertion failure aborts the whole batch; the caller decides what
/// happens to the device.
pub fn build_readings(
    requests: &[CommandRequest],
    results: &[CommandResult],
    data_transform: bool,
) -> Result<Vec<Reading>, SdkError> {
    let mut readings = Vec::with_capacity(results.len());
    for (req, result) in requests.iter().zip(results) {
        let props = &req.resource.properties.value;
        let value = if data_transform {
            transform::outgoing(result.value.clone(), props)
        } else {
            result.value.clone()
        };
        let wire = value.to_wire_string();
        transform::check_assertion(&wire, props)?;
        let wire = transform::map_outgoing(wire, &req.operation.mappings);
        let media_type = match value {
            DeviceValue::Binary(_) => props.media_type.clone(),
            _ => None,
        };
        readings.push(Reading {
            name: req.resource.name.clone(),
            value: wire,
            origin: if result.origin != 0 {
                result.origin
            } else {
                now_ms()
            },
            value_type: value.value_type(),
            media_type,
        });
    }
    Ok(readings)
}

/// Wrap readings into an event and enqueue the post. Returns immediately.
pub fn publish(pool: &WorkerPool, data: Arc<dyn DataClient>, device: &str, readings: Vec<Reading>) {
    if readings.is_empty() {
        return;
    }
    let event = Event {
        device: device.to_string(),
        origin: now_ms(),
        readings,
    };
    let submitted = pool.submit(async move {
        match data.add_event(&event).await {
            Ok(()) => debug!(device = %event.device, readings = event.readings.len(), "event posted"),
            Err(err) => error!(device = %event.device, %err, "failed to post event"),
        }
    });
    if !submitted {
        error!(device, "event dropped: worker pool is shut down");
    }
}
