//! In-memory platform clients for tests and demos.
//!
//! These model just enough platform behaviour for the runtime's contract:
//! id assignment on create, conflict on duplicate names, 404-as-`None`
//! lookups. State is inspectable so tests can assert on what the runtime
//! pushed to the platform.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use edgelink_core::models::{
    Addressable, Device, DeviceProfile, DeviceServiceRecord, Event, Schedule, ScheduleEvent,
};
use edgelink_core::SdkError;

use super::{ConfigRegistry, DataClient, MetadataClient};

/// Data service fake recording every posted event.
#[derive(Default)]
pub struct MockDataClient {
    events: Mutex<Vec<Event>>,
    ping_ok: AtomicBool,
    ping_count: AtomicUsize,
    fail_posts: AtomicBool,
}

impl MockDataClient {
    pub fn new() -> Self {
        let client = Self::default();
        client.ping_ok.store(true, Ordering::SeqCst);
        client
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn ping_count(&self) -> usize {
        self.ping_count.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataClient for MockDataClient {
    async fn ping(&self) -> Result<(), SdkError> {
        self.ping_count.fetch_add(1, Ordering::SeqCst);
        if self.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SdkError::DataClientFail("ping refused".to_string()))
        }
    }

    async fn add_event(&self, event: &Event) -> Result<(), SdkError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(SdkError::DataClientFail("post refused".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MetaState {
    addressables: HashMap<String, Addressable>,
    services: HashMap<String, DeviceServiceRecord>,
    profiles: HashMap<String, DeviceProfile>,
    devices: HashMap<String, Device>,
    schedules: HashMap<String, Schedule>,
    schedule_events: HashMap<String, ScheduleEvent>,
}

/// Metadata service fake with platform-like create semantics.
#[derive(Default)]
pub struct MockMetadataClient {
    state: Mutex<MetaState>,
    seq: AtomicUsize,
    ping_ok: AtomicBool,
}

impl MockMetadataClient {
    pub fn new() -> Self {
        let client = Self::default();
        client.ping_ok.store(true, Ordering::SeqCst);
        client
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{kind}-{}", self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Pre-load a profile, as if another party had registered it.
    pub fn seed_profile(&self, profile: DeviceProfile) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.name.clone(), profile);
    }

    /// Pre-load a device owned by some service.
    pub fn seed_device(&self, device: Device) {
        self.state
            .lock()
            .unwrap()
            .devices
            .insert(device.id.clone(), device);
    }

    pub fn device_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .devices
            .values()
            .map(|d| d.name.clone())
            .collect()
    }

    pub fn schedule_names(&self) -> Vec<String> {
        self.state.lock().unwrap().schedules.keys().cloned().collect()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.state.lock().unwrap().services.keys().cloned().collect()
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.state.lock().unwrap().profiles.keys().cloned().collect()
    }
}

#[async_trait]
impl MetadataClient for MockMetadataClient {
    async fn ping(&self) -> Result<(), SdkError> {
        if self.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SdkError::MetadataClientFail("ping refused".to_string()))
        }
    }

    async fn get_addressable(&self, name: &str) -> Result<Option<Addressable>, SdkError> {
        Ok(self.state.lock().unwrap().addressables.get(name).cloned())
    }

    async fn create_addressable(&self, addressable: &Addressable) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.addressables.contains_key(&addressable.name) {
            return Err(SdkError::HttpConflict(addressable.name.clone()));
        }
        let mut stored = addressable.clone();
        stored.id = self.next_id("addr");
        let id = stored.id.clone();
        state.addressables.insert(stored.name.clone(), stored);
        Ok(id)
    }

    async fn get_device_service(
        &self,
        name: &str,
    ) -> Result<Option<DeviceServiceRecord>, SdkError> {
        Ok(self.state.lock().unwrap().services.get(name).cloned())
    }

    async fn create_device_service(
        &self,
        record: &DeviceServiceRecord,
    ) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.services.contains_key(&record.name) {
            return Err(SdkError::HttpConflict(record.name.clone()));
        }
        let mut stored = record.clone();
        stored.id = self.next_id("svc");
        let id = stored.id.clone();
        state.services.insert(stored.name.clone(), stored);
        Ok(id)
    }

    async fn upload_profile(&self, profile: &DeviceProfile) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.profiles.contains_key(&profile.name) {
            return Err(SdkError::HttpConflict(profile.name.clone()));
        }
        let mut stored = profile.clone();
        if stored.id.is_empty() {
            stored.id = self.next_id("profile");
        }
        let id = stored.id.clone();
        state.profiles.insert(stored.name.clone(), stored);
        Ok(id)
    }

    async fn get_profile(&self, name: &str) -> Result<Option<DeviceProfile>, SdkError> {
        Ok(self.state.lock().unwrap().profiles.get(name).cloned())
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<DeviceProfile>, SdkError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .values()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_devices(&self, service: &str) -> Result<Vec<Device>, SdkError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .devices
            .values()
            .filter(|d| d.service == service)
            .cloned()
            .collect())
    }

    async fn get_device(&self, id: &str) -> Result<Option<Device>, SdkError> {
        Ok(self.state.lock().unwrap().devices.get(id).cloned())
    }

    async fn get_device_by_name(&self, name: &str) -> Result<Option<Device>, SdkError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .devices
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn create_device(&self, device: &Device) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.devices.values().any(|d| d.name == device.name) {
            return Err(SdkError::HttpConflict(device.name.clone()));
        }
        let mut stored = device.clone();
        stored.id = self.next_id("dev");
        let id = stored.id.clone();
        state.devices.insert(id.clone(), stored);
        Ok(id)
    }

    async fn update_device(&self, device: &Device) -> Result<(), SdkError> {
        let mut state = self.state.lock().unwrap();
        match state.devices.get_mut(&device.id) {
            Some(stored) => {
                *stored = device.clone();
                Ok(())
            }
            None => Err(SdkError::HttpNotFound(format!("device {}", device.id))),
        }
    }

    async fn delete_device(&self, id: &str) -> Result<(), SdkError> {
        let mut state = self.state.lock().unwrap();
        state
            .devices
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {id}")))
    }

    async fn create_schedule(&self, name: &str, frequency: &str) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.schedules.contains_key(name) {
            return Err(SdkError::HttpConflict(name.to_string()));
        }
        let schedule = Schedule {
            id: self.next_id("sched"),
            name: name.to_string(),
            frequency: frequency.to_string(),
        };
        let id = schedule.id.clone();
        state.schedules.insert(name.to_string(), schedule);
        Ok(id)
    }

    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SdkError> {
        Ok(self.state.lock().unwrap().schedules.get(name).cloned())
    }

    async fn create_schedule_event(&self, event: &ScheduleEvent) -> Result<String, SdkError> {
        let mut state = self.state.lock().unwrap();
        if state.schedule_events.contains_key(&event.name) {
            return Err(SdkError::HttpConflict(event.name.clone()));
        }
        let mut stored = event.clone();
        stored.id = self.next_id("schedevt");
        let id = stored.id.clone();
        state.schedule_events.insert(stored.name.clone(), stored);
        Ok(id)
    }

    async fn get_schedule_events(&self, service: &str) -> Result<Vec<ScheduleEvent>, SdkError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .schedule_events
            .values()
            .filter(|e| e.service == service)
            .cloned()
            .collect())
    }
}

/// Configuration registry fake.
#[derive(Default)]
pub struct MockConfigRegistry {
    config: Mutex<Option<Vec<(String, String)>>>,
    registrations: Mutex<Vec<(String, String, u16, String)>>,
}

impl MockConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(pairs: Vec<(String, String)>) -> Self {
        let registry = Self::default();
        *registry.config.lock().unwrap() = Some(pairs);
        registry
    }

    pub fn stored_config(&self) -> Option<Vec<(String, String)>> {
        self.config.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<(String, String, u16, String)> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfigRegistry for MockConfigRegistry {
    async fn ping(&self) -> Result<(), SdkError> {
        Ok(())
    }

    async fn get_config(
        &self,
        _service: &str,
        _profile: Option<&str>,
    ) -> Result<Option<Vec<(String, String)>>, SdkError> {
        Ok(self.config.lock().unwrap().clone())
    }

    async fn put_config(
        &self,
        _service: &str,
        _profile: Option<&str>,
        pairs: &[(String, String)],
    ) -> Result<(), SdkError> {
        *self.config.lock().unwrap() = Some(pairs.to_vec());
        Ok(())
    }

    async fn register_service(
        &self,
        name: &str,
        host: &str,
        port: u16,
        check_interval: &str,
    ) -> Result<(), SdkError> {
        self.registrations.lock().unwrap().push((
            name.to_string(),
            host.to_string(),
            port,
            check_interval.to_string(),
        ));
        Ok(())
    }
}
