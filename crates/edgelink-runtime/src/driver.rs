//! Southbound driver contract.
//!
//! A protocol adapter embeds the runtime and supplies one value
//! implementing [`ProtocolDriver`]. The runtime forwards resolved command
//! requests to it and never inspects protocol details; the `attributes` of
//! each device resource are the driver's routing hints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Weak};

use async_trait::async_trait;

use edgelink_core::models::{Addressable, DeviceResource, ResourceOperation};
use edgelink_core::{DeviceValue, SdkError};

use crate::service::DeviceService;

/// One resolved get/set step handed to the driver: the profile operation
/// and the device resource it addresses.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub operation: ResourceOperation,
    pub resource: DeviceResource,
}

/// A value read from a device. `origin` is zero unless the device supplied
/// its own timestamp, in which case the runtime preserves it.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub origin: u64,
    pub value: DeviceValue,
}

impl CommandResult {
    /// A result stamped by the runtime at serialization time.
    pub fn new(value: DeviceValue) -> Self {
        Self { origin: 0, value }
    }
}

/// Capability interface implemented by the protocol driver.
///
/// Drivers own their state and must tolerate concurrent invocations; the
/// runtime holds no lock while calling into them.
#[async_trait]
pub trait ProtocolDriver: Send + Sync {
    /// Called once during startup with the `[Driver]` configuration table.
    async fn initialize(&self, config: &HashMap<String, String>) -> Result<(), SdkError>;

    /// Read the requested resources from one device.
    ///
    /// Must return exactly one result per request, in request order.
    async fn handle_get(
        &self,
        device: &Addressable,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandResult>, SdkError>;

    /// Write the given values to one device, one per request, in order.
    async fn handle_put(
        &self,
        device: &Addressable,
        requests: &[CommandRequest],
        values: &[DeviceValue],
    ) -> Result<(), SdkError>;

    /// Detect devices and register findings through
    /// [`DiscoveryContext::add_device`]. Optional; the default does nothing.
    async fn discover(&self, _ctx: DiscoveryContext) {}

    /// Shut down. On `force`, abandon outstanding protocol work.
    async fn stop(&self, force: bool);
}

/// Handle passed to [`ProtocolDriver::discover`] for registering findings.
///
/// Holds the service weakly: discovery outliving a stopping service simply
/// sees its registrations fail.
#[derive(Clone)]
pub struct DiscoveryContext {
    service: Weak<DeviceService>,
}

impl DiscoveryContext {
    pub(crate) fn new(service: Weak<DeviceService>) -> Self {
        Self { service }
    }

    /// Register a discovered device, creating it in metadata and the local
    /// registry. Returns the device id; a duplicate name yields the
    /// existing id.
    pub async fn add_device(
        &self,
        name: &str,
        description: &str,
        labels: &[String],
        profile_name: &str,
        addressable: Addressable,
    ) -> Result<String, SdkError> {
        let svc = self
            .service
            .upgrade()
            .ok_or_else(|| SdkError::InvalidArg("service is shutting down".to_string()))?;
        svc.add_device(name, description, labels, profile_name, addressable)
            .await
    }
}

/// Scripted driver used by the test suites and the demo adapter.
///
/// Readings are served from a name->value table; writes are recorded for
/// later inspection.
#[derive(Default)]
pub struct MockDriver {
    readings: Mutex<HashMap<String, DeviceValue>>,
    writes: Mutex<Vec<(String, DeviceValue)>>,
    fail_requests: AtomicBool,
    initialized: AtomicBool,
    stopped: AtomicBool,
    get_count: AtomicUsize,
    put_count: AtomicUsize,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned for a resource name.
    pub fn set_reading(&self, resource: &str, value: DeviceValue) {
        self.readings
            .lock()
            .unwrap()
            .insert(resource.to_string(), value);
    }

    /// Make subsequent get/put requests fail.
    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(String, DeviceValue)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolDriver for MockDriver {
    async fn initialize(&self, _config: &HashMap<String, String>) -> Result<(), SdkError> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_get(
        &self,
        _device: &Addressable,
        requests: &[CommandRequest],
    ) -> Result<Vec<CommandResult>, SdkError> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(SdkError::DriverError("scripted failure".to_string()));
        }
        let readings = self.readings.lock().unwrap();
        requests
            .iter()
            .map(|req| {
                readings
                    .get(&req.resource.name)
                    .cloned()
                    .map(CommandResult::new)
                    .ok_or_else(|| {
                        SdkError::DriverError(format!("no reading for {}", req.resource.name))
                    })
            })
            .collect()
    }

    async fn handle_put(
        &self,
        _device: &Addressable,
        requests: &[CommandRequest],
        values: &[DeviceValue],
    ) -> Result<(), SdkError> {
        self.put_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            return Err(SdkError::DriverError("scripted failure".to_string()));
        }
        let mut writes = self.writes.lock().unwrap();
        for (req, value) in requests.iter().zip(values) {
            writes.push((req.resource.name.clone(), value.clone()));
        }
        Ok(())
    }

    async fn stop(&self, _force: bool) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}
