//! Platform callback reconciliation tests.

use std::sync::Arc;

use edgelink_core::config::Config;
use edgelink_core::models::{
    CallbackPayload, CallbackType, Device, DeviceProfile, ProfileResource,
};
use edgelink_core::SdkError;
use edgelink_runtime::callback::{self, CallbackMethod};
use edgelink_runtime::clients::mock::{MockDataClient, MockMetadataClient};
use edgelink_runtime::{DeviceService, MockDriver, NoopRestServer};

fn profile(name: &str, id: &str) -> DeviceProfile {
    DeviceProfile {
        id: id.to_string(),
        name: name.to_string(),
        resources: vec![ProfileResource {
            name: "status".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

struct Fixture {
    svc: Arc<DeviceService>,
    metadata: Arc<MockMetadataClient>,
}

fn fixture() -> Fixture {
    let metadata = Arc::new(MockMetadataClient::new());
    let svc = DeviceService::new(
        "cb-adapter",
        "0.1.0",
        Arc::new(MockDriver::new()),
        Arc::new(NoopRestServer),
    )
    .unwrap();
    svc.set_platform_clients(Arc::new(MockDataClient::new()), metadata.clone());
    svc.set_config(Config::default());
    Fixture { svc, metadata }
}

fn payload(kind: CallbackType, id: &str) -> CallbackPayload {
    CallbackPayload {
        kind,
        id: id.to_string(),
    }
}

#[tokio::test]
async fn device_add_fetches_profile_and_inserts() {
    let f = fixture();
    f.metadata.seed_profile(profile("gauge", "prof-9"));
    f.metadata.seed_device(Device {
        id: "dev-9".to_string(),
        name: "gauge-1".to_string(),
        profile_name: "gauge".to_string(),
        service: "cb-adapter".to_string(),
        ..Default::default()
    });

    callback::apply(
        &f.svc,
        CallbackMethod::Post,
        &payload(CallbackType::Device, "dev-9"),
    )
    .await
    .unwrap();

    let device = f.svc.registry().get_by_id("dev-9").await.unwrap();
    assert_eq!(device.name, "gauge-1");
    assert!(f.svc.registry().has_profile("gauge").await);
}

#[tokio::test]
async fn device_update_replaces_record() {
    let f = fixture();
    f.metadata.seed_profile(profile("gauge", "prof-9"));
    f.metadata.seed_device(Device {
        id: "dev-9".to_string(),
        name: "gauge-1".to_string(),
        profile_name: "gauge".to_string(),
        service: "cb-adapter".to_string(),
        ..Default::default()
    });
    callback::apply(
        &f.svc,
        CallbackMethod::Post,
        &payload(CallbackType::Device, "dev-9"),
    )
    .await
    .unwrap();

    // the platform renames the device and notifies us again
    f.metadata.seed_device(Device {
        id: "dev-9".to_string(),
        name: "gauge-renamed".to_string(),
        profile_name: "gauge".to_string(),
        service: "cb-adapter".to_string(),
        ..Default::default()
    });
    callback::apply(
        &f.svc,
        CallbackMethod::Put,
        &payload(CallbackType::Device, "dev-9"),
    )
    .await
    .unwrap();

    assert!(f.svc.registry().get_by_name("gauge-1").await.is_none());
    let device = f.svc.registry().get_by_name("gauge-renamed").await.unwrap();
    assert_eq!(device.id, "dev-9");
}

#[tokio::test]
async fn device_delete_removes_from_registry() {
    let f = fixture();
    f.metadata.seed_profile(profile("gauge", "prof-9"));
    f.metadata.seed_device(Device {
        id: "dev-9".to_string(),
        name: "gauge-1".to_string(),
        profile_name: "gauge".to_string(),
        service: "cb-adapter".to_string(),
        ..Default::default()
    });
    callback::apply(
        &f.svc,
        CallbackMethod::Post,
        &payload(CallbackType::Device, "dev-9"),
    )
    .await
    .unwrap();

    callback::apply(
        &f.svc,
        CallbackMethod::Delete,
        &payload(CallbackType::Device, "dev-9"),
    )
    .await
    .unwrap();
    assert!(f.svc.registry().get_by_id("dev-9").await.is_none());
}

#[tokio::test]
async fn unknown_device_is_not_found() {
    let f = fixture();
    let err = callback::apply(
        &f.svc,
        CallbackMethod::Post,
        &payload(CallbackType::Device, "ghost"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn profile_update_and_guarded_delete() {
    let f = fixture();
    f.metadata.seed_profile(profile("gauge", "prof-9"));

    callback::apply(
        &f.svc,
        CallbackMethod::Put,
        &payload(CallbackType::Profile, "prof-9"),
    )
    .await
    .unwrap();
    assert!(f.svc.registry().has_profile("gauge").await);

    // a device referencing the profile blocks deletion
    f.svc
        .registry()
        .add(Device {
            id: "dev-1".to_string(),
            name: "gauge-1".to_string(),
            profile_name: "gauge".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let err = callback::apply(
        &f.svc,
        CallbackMethod::Delete,
        &payload(CallbackType::Profile, "prof-9"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::HttpConflict(_)));
    assert_eq!(err.http_status(), 409);

    f.svc.registry().remove("dev-1").await.unwrap();
    callback::apply(
        &f.svc,
        CallbackMethod::Delete,
        &payload(CallbackType::Profile, "prof-9"),
    )
    .await
    .unwrap();
    assert!(!f.svc.registry().has_profile("gauge").await);
}

#[tokio::test]
async fn service_notifications_are_acknowledged() {
    let f = fixture();
    callback::apply(
        &f.svc,
        CallbackMethod::Put,
        &payload(CallbackType::Service, "svc-1"),
    )
    .await
    .unwrap();
}
