//! Platform service clients.
//!
//! The runtime consumes three platform services: the data service (event
//! ingestion), the metadata service (device/profile/schedule records) and
//! an optional configuration registry. Each is an async trait so the
//! orchestrator and the test suites can swap the HTTP implementations in
//! [`http`] for the in-memory fakes in [`mock`].

pub mod http;
pub mod mock;

use async_trait::async_trait;

use edgelink_core::models::{
    Addressable, Device, DeviceProfile, DeviceServiceRecord, Event, Schedule, ScheduleEvent,
};
use edgelink_core::SdkError;

/// Client for the platform data service.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn ping(&self) -> Result<(), SdkError>;

    /// Submit one event. At-most-once; the caller logs failures.
    async fn add_event(&self, event: &Event) -> Result<(), SdkError>;
}

/// Client for the platform metadata service.
///
/// Create operations return the id assigned by the platform. A create that
/// collides with an existing record fails with [`SdkError::HttpConflict`];
/// callers on idempotent paths downgrade that to informational.
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn ping(&self) -> Result<(), SdkError>;

    async fn get_addressable(&self, name: &str) -> Result<Option<Addressable>, SdkError>;
    async fn create_addressable(&self, addressable: &Addressable) -> Result<String, SdkError>;

    async fn get_device_service(
        &self,
        name: &str,
    ) -> Result<Option<DeviceServiceRecord>, SdkError>;
    async fn create_device_service(
        &self,
        record: &DeviceServiceRecord,
    ) -> Result<String, SdkError>;

    async fn upload_profile(&self, profile: &DeviceProfile) -> Result<String, SdkError>;
    async fn get_profile(&self, name: &str) -> Result<Option<DeviceProfile>, SdkError>;
    async fn get_profile_by_id(&self, id: &str) -> Result<Option<DeviceProfile>, SdkError>;

    /// All devices owned by the named device service.
    async fn get_devices(&self, service: &str) -> Result<Vec<Device>, SdkError>;
    async fn get_device(&self, id: &str) -> Result<Option<Device>, SdkError>;
    async fn get_device_by_name(&self, name: &str) -> Result<Option<Device>, SdkError>;
    async fn create_device(&self, device: &Device) -> Result<String, SdkError>;
    async fn update_device(&self, device: &Device) -> Result<(), SdkError>;
    async fn delete_device(&self, id: &str) -> Result<(), SdkError>;

    async fn create_schedule(&self, name: &str, frequency: &str) -> Result<String, SdkError>;
    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SdkError>;
    async fn create_schedule_event(&self, event: &ScheduleEvent) -> Result<String, SdkError>;
    async fn get_schedule_events(&self, service: &str) -> Result<Vec<ScheduleEvent>, SdkError>;
}

/// Client for an optional configuration registry.
#[async_trait]
pub trait ConfigRegistry: Send + Sync {
    async fn ping(&self) -> Result<(), SdkError>;

    /// Stored configuration for the named service, as flat name/value
    /// pairs. `None` when the registry holds nothing for it yet.
    async fn get_config(
        &self,
        service: &str,
        profile: Option<&str>,
    ) -> Result<Option<Vec<(String, String)>>, SdkError>;

    async fn put_config(
        &self,
        service: &str,
        profile: Option<&str>,
        pairs: &[(String, String)],
    ) -> Result<(), SdkError>;

    /// Register this service's health-check endpoint.
    async fn register_service(
        &self,
        name: &str,
        host: &str,
        port: u16,
        check_interval: &str,
    ) -> Result<(), SdkError>;
}
