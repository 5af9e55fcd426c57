//! Domain model: devices, profiles, addressables, readings and the
//! platform metadata records the runtime exchanges with its collaborators.
//!
//! Wire names follow the platform's camelCase convention; the Rust side
//! stays snake_case via serde renames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::PropertyType;

/// Current wall-clock time in milliseconds, used for reading origins.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Network-locator record for a device or for the adapter itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Addressable {
    pub id: String,
    pub name: String,
    pub origin: u64,
    pub protocol: String,
    pub method: String,
    pub address: String,
    pub port: u16,
    pub path: String,
}

impl Addressable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: now_ms(),
            protocol: "HTTP".to_string(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, address: impl Into<String>, port: u16) -> Self {
        self.address = address.into();
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Value descriptor of a device resource: type, direction and the numeric
/// transform parameters applied between driver and platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyValue {
    #[serde(rename = "type")]
    pub value_type: PropertyType,
    /// "R", "W" or "RW"
    pub read_write: String,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub default_value: Option<String>,
    pub base: Option<f64>,
    pub scale: Option<f64>,
    pub offset: Option<f64>,
    pub mask: Option<u64>,
    pub shift: Option<u32>,
    /// Expected wire form of the reading; mismatch disables the device.
    pub assertion: Option<String>,
    pub media_type: Option<String>,
}

impl PropertyValue {
    /// Whether writes are permitted on this resource.
    pub fn writable(&self) -> bool {
        self.read_write.is_empty() || self.read_write.contains('W')
    }
}

/// Properties block of a device resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceProperties {
    pub value: PropertyValue,
    pub units: Option<String>,
}

/// A named, typed datum a device exposes.
///
/// `attributes` are opaque to the runtime and forwarded to the driver as
/// protocol routing hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceResource {
    pub name: String,
    pub description: String,
    pub properties: ResourceProperties,
    pub attributes: HashMap<String, String>,
}

/// One step of a profile command: which resource to touch and how to remap
/// its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceOperation {
    pub index: u32,
    pub operation: String,
    /// Device resource name this operation addresses.
    pub object: String,
    /// Fallback write value when the request body omits this resource.
    pub parameter: String,
    /// Enumeration remap applied to the string form of the value.
    pub mappings: HashMap<String, String>,
}

/// A named command: the ordered get/set operations it performs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileResource {
    pub name: String,
    pub get: Vec<ResourceOperation>,
    pub set: Vec<ResourceOperation>,
}

/// Schema of resources and commands a class of devices supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub labels: Vec<String>,
    pub device_resources: Vec<DeviceResource>,
    pub resources: Vec<ProfileResource>,
    pub commands: Vec<String>,
}

impl DeviceProfile {
    pub fn resource(&self, name: &str) -> Option<&DeviceResource> {
        self.device_resources.iter().find(|r| r.name == name)
    }

    pub fn command(&self, name: &str) -> Option<&ProfileResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Administrative state set by operators through the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdminState {
    Locked,
    #[default]
    Unlocked,
}

/// Operational state; the runtime disables a device on assertion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingState {
    #[default]
    Enabled,
    Disabled,
}

/// A managed endpoint: identity, states, locator and profile reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub description: String,
    pub labels: Vec<String>,
    pub admin_state: AdminState,
    #[serde(rename = "operatingState")]
    pub op_state: OperatingState,
    pub origin: u64,
    pub addressable: Addressable,
    /// Profile reference, by name.
    pub profile_name: String,
    /// Owning device service, by name.
    pub service: String,
}

/// One value emitted to the platform data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub name: String,
    pub value: String,
    pub origin: u64,
    pub value_type: PropertyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A batch of readings from one device, posted to the data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub device: String,
    pub origin: u64,
    pub readings: Vec<Reading>,
}

/// Metadata record describing this adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceServiceRecord {
    pub id: String,
    pub name: String,
    pub addressable: Addressable,
    pub admin_state: AdminState,
    #[serde(rename = "operatingState")]
    pub op_state: OperatingState,
    pub labels: Vec<String>,
    pub origin: u64,
}

/// Named recurrence registered in metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    pub id: String,
    pub name: String,
    /// ISO-8601 duration, e.g. `PT10S`.
    pub frequency: String,
}

/// Binding of a schedule to a self-invoked path on this adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEvent {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub path: String,
    pub service: String,
}

/// Entity kind named in a platform callback notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackType {
    Device,
    Profile,
    Service,
}

/// Body of `PUT|POST|DELETE /api/v1/callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackPayload {
    #[serde(rename = "type")]
    pub kind: CallbackType,
    pub id: String,
}
