//! In-process device and profile registry.
//!
//! Two maps hold the device set: `by_id` owns the records, `name_to_id`
//! resolves names. Both live under a single fair `RwLock`, so bursts of
//! concurrent readers (an `all` command fan-out) queue behind pending
//! writers instead of starving discovery and callback updates. The profile
//! map is an independent hot path and has its own mutex.
//!
//! Invariants:
//! - every `(name, id)` pair in `name_to_id` satisfies
//!   `by_id[id].name == name`;
//! - a device is only inserted while its profile is loaded;
//! - a profile cannot be removed while any device references it.

use std::collections::HashMap;

use tokio::sync::{Mutex, RwLock};

use edgelink_core::models::{
    Addressable, AdminState, Device, DeviceProfile, OperatingState,
};
use edgelink_core::SdkError;

#[derive(Default)]
struct DeviceStore {
    by_id: HashMap<String, Device>,
    name_to_id: HashMap<String, String>,
}

/// Field replacement set for [`DeviceRegistry::update`]. Unset fields keep
/// their current value.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
    pub profile_name: Option<String>,
    pub admin_state: Option<AdminState>,
    pub op_state: Option<OperatingState>,
    pub addressable: Option<Addressable>,
}

/// Thread-safe store of the devices and profiles this adapter serves.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<DeviceStore>,
    profiles: Mutex<HashMap<String, DeviceProfile>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Device> {
        self.devices.read().await.by_id.get(id).cloned()
    }

    pub async fn get_by_name(&self, name: &str) -> Option<Device> {
        let store = self.devices.read().await;
        let id = store.name_to_id.get(name)?;
        store.by_id.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Device> {
        self.devices.read().await.by_id.values().cloned().collect()
    }

    pub async fn device_count(&self) -> usize {
        self.devices.read().await.by_id.len()
    }

    /// Insert a new device. Rejects a duplicate id or name, and a device
    /// whose profile is not loaded.
    pub async fn add(&self, device: Device) -> Result<(), SdkError> {
        let mut store = self.devices.write().await;
        if store.by_id.contains_key(&device.id) || store.name_to_id.contains_key(&device.name) {
            return Err(SdkError::DuplicateDevice(device.name));
        }
        if !self.profiles.lock().await.contains_key(&device.profile_name) {
            return Err(SdkError::ProfileNotFound(device.profile_name));
        }
        store.name_to_id.insert(device.name.clone(), device.id.clone());
        store.by_id.insert(device.id.clone(), device);
        Ok(())
    }

    /// Insert or replace a device, keeping both maps consistent. Used by
    /// the platform callback path where the incoming record wins.
    pub async fn upsert(&self, device: Device) -> Result<(), SdkError> {
        let mut store = self.devices.write().await;
        if !self.profiles.lock().await.contains_key(&device.profile_name) {
            return Err(SdkError::ProfileNotFound(device.profile_name));
        }
        if let Some(old) = store.by_id.remove(&device.id) {
            store.name_to_id.remove(&old.name);
        }
        if let Some(stale_id) = store.name_to_id.get(&device.name).cloned() {
            if stale_id != device.id {
                return Err(SdkError::DuplicateDevice(device.name));
            }
        }
        store.name_to_id.insert(device.name.clone(), device.id.clone());
        store.by_id.insert(device.id.clone(), device);
        Ok(())
    }

    /// Atomically replace fields of the device matching `key` (id first,
    /// then name). A rename updates both maps in the same critical section.
    pub async fn update(&self, key: &str, update: DeviceUpdate) -> Result<Device, SdkError> {
        if let Some(profile) = &update.profile_name {
            if !self.profiles.lock().await.contains_key(profile) {
                return Err(SdkError::ProfileNotFound(profile.clone()));
            }
        }
        let mut store = self.devices.write().await;
        let id = if store.by_id.contains_key(key) {
            key.to_string()
        } else {
            store
                .name_to_id
                .get(key)
                .cloned()
                .ok_or_else(|| SdkError::HttpNotFound(format!("device {key}")))?
        };
        if let Some(new_name) = &update.name {
            if let Some(other) = store.name_to_id.get(new_name) {
                if *other != id {
                    return Err(SdkError::DuplicateDevice(new_name.clone()));
                }
            }
        }
        let device = store
            .by_id
            .get_mut(&id)
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {key}")))?;
        let old_name = device.name.clone();
        if let Some(name) = update.name {
            device.name = name;
        }
        if let Some(description) = update.description {
            device.description = description;
        }
        if let Some(labels) = update.labels {
            device.labels = labels;
        }
        if let Some(profile) = update.profile_name {
            device.profile_name = profile;
        }
        if let Some(admin) = update.admin_state {
            device.admin_state = admin;
        }
        if let Some(op) = update.op_state {
            device.op_state = op;
        }
        if let Some(addressable) = update.addressable {
            device.addressable = addressable;
        }
        let updated = device.clone();
        if updated.name != old_name {
            store.name_to_id.remove(&old_name);
            store.name_to_id.insert(updated.name.clone(), id);
        }
        Ok(updated)
    }

    /// Mark a device operationally disabled (assertion failure path).
    pub async fn disable(&self, id: &str) {
        let mut store = self.devices.write().await;
        if let Some(device) = store.by_id.get_mut(id) {
            device.op_state = OperatingState::Disabled;
        }
    }

    pub async fn remove(&self, id: &str) -> Result<Device, SdkError> {
        let mut store = self.devices.write().await;
        let device = store
            .by_id
            .remove(id)
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {id}")))?;
        store.name_to_id.remove(&device.name);
        Ok(device)
    }

    pub async fn remove_by_name(&self, name: &str) -> Result<Device, SdkError> {
        let mut store = self.devices.write().await;
        let id = store
            .name_to_id
            .remove(name)
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {name}")))?;
        let device = store
            .by_id
            .remove(&id)
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {name}")))?;
        Ok(device)
    }

    /// Drop every device and profile. Shutdown only.
    pub async fn clear(&self) {
        let mut store = self.devices.write().await;
        store.by_id.clear();
        store.name_to_id.clear();
        drop(store);
        self.profiles.lock().await.clear();
    }

    // ========== Profiles ==========

    pub async fn add_profile(&self, profile: DeviceProfile) {
        self.profiles
            .lock()
            .await
            .insert(profile.name.clone(), profile);
    }

    pub async fn get_profile(&self, name: &str) -> Option<DeviceProfile> {
        self.profiles.lock().await.get(name).cloned()
    }

    pub async fn find_profile_by_id(&self, id: &str) -> Option<DeviceProfile> {
        self.profiles
            .lock()
            .await
            .values()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn has_profile(&self, name: &str) -> bool {
        self.profiles.lock().await.contains_key(name)
    }

    /// Deep copies of every loaded profile.
    pub async fn snapshot_profiles(&self) -> Vec<DeviceProfile> {
        self.profiles.lock().await.values().cloned().collect()
    }

    /// Remove a profile. Fails with a conflict while any device still
    /// references it.
    pub async fn remove_profile(&self, name: &str) -> Result<(), SdkError> {
        let store = self.devices.read().await;
        if let Some(dev) = store.by_id.values().find(|d| d.profile_name == name) {
            return Err(SdkError::HttpConflict(format!(
                "profile {name} is referenced by device {}",
                dev.name
            )));
        }
        let mut profiles = self.profiles.lock().await;
        profiles
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SdkError::HttpNotFound(format!("profile {name}")))
    }
}
