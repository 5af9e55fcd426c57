//! Core types for the edgelink device-adapter runtime.
//!
//! This crate holds everything the runtime and its HTTP surface share:
//! the typed value model, the device/profile domain model, the
//! configuration surface and the error type.

pub mod config;
pub mod error;
pub mod models;
pub mod value;

pub use config::{parse_iso8601_duration, Config};
pub use error::SdkError;
pub use models::{
    Addressable, AdminState, CallbackPayload, CallbackType, Device, DeviceProfile,
    DeviceResource, DeviceServiceRecord, Event, OperatingState, ProfileResource, PropertyValue,
    Reading, ResourceOperation, ResourceProperties, Schedule, ScheduleEvent, now_ms,
};
pub use value::{DeviceValue, PropertyType};
