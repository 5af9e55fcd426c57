//! Platform-initiated metadata callbacks.
//!
//! The platform notifies the adapter of device/profile changes it made by
//! POST/PUT/DELETE against `/api/v1/callback` with an entity kind and id.
//! The handler re-fetches the authoritative record from metadata and
//! reconciles the local registry.

use std::sync::Arc;

use tracing::info;

use edgelink_core::models::{CallbackPayload, CallbackType};
use edgelink_core::SdkError;

use crate::service::DeviceService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMethod {
    Post,
    Put,
    Delete,
}

/// Apply one callback notification to the registry.
pub async fn apply(
    svc: &Arc<DeviceService>,
    method: CallbackMethod,
    payload: &CallbackPayload,
) -> Result<(), SdkError> {
    match (payload.kind, method) {
        (CallbackType::Device, CallbackMethod::Post | CallbackMethod::Put) => {
            let device = svc
                .metadata_client()?
                .get_device(&payload.id)
                .await?
                .ok_or_else(|| SdkError::HttpNotFound(format!("device {}", payload.id)))?;
            svc.ensure_profile(&device.profile_name).await?;
            info!(device = %device.name, "callback: device upserted");
            svc.registry().upsert(device).await
        }
        (CallbackType::Device, CallbackMethod::Delete) => {
            let removed = svc.registry().remove(&payload.id).await?;
            info!(device = %removed.name, "callback: device removed");
            Ok(())
        }
        (CallbackType::Profile, CallbackMethod::Post | CallbackMethod::Put) => {
            let profile = svc
                .metadata_client()?
                .get_profile_by_id(&payload.id)
                .await?
                .ok_or_else(|| SdkError::HttpNotFound(format!("profile {}", payload.id)))?;
            info!(profile = %profile.name, "callback: profile upserted");
            svc.registry().add_profile(profile).await;
            Ok(())
        }
        (CallbackType::Profile, CallbackMethod::Delete) => {
            let profile = svc
                .registry()
                .find_profile_by_id(&payload.id)
                .await
                .ok_or_else(|| SdkError::HttpNotFound(format!("profile {}", payload.id)))?;
            svc.registry().remove_profile(&profile.name).await?;
            info!(profile = %profile.name, "callback: profile removed");
            Ok(())
        }
        (CallbackType::Service, _) => {
            info!(id = %payload.id, "callback: service notification ignored");
            Ok(())
        }
    }
}
