//! End-to-end dispatcher tests against a scripted driver and in-memory
//! platform clients.

use std::sync::Arc;

use edgelink_core::config::Config;
use edgelink_core::models::{
    AdminState, Device, DeviceProfile, DeviceResource, OperatingState, ProfileResource,
    PropertyValue, ResourceOperation, ResourceProperties,
};
use edgelink_core::{DeviceValue, PropertyType, SdkError};
use edgelink_runtime::clients::mock::{MockDataClient, MockMetadataClient};
use edgelink_runtime::command::{self, CommandMethod, DeviceSelector};
use edgelink_runtime::{DeviceService, MockDriver, NoopRestServer};

fn resource(name: &str, props: PropertyValue) -> DeviceResource {
    DeviceResource {
        name: name.to_string(),
        properties: ResourceProperties {
            value: props,
            units: None,
        },
        ..Default::default()
    }
}

fn get_op(index: u32, object: &str) -> ResourceOperation {
    ResourceOperation {
        index,
        operation: "get".to_string(),
        object: object.to_string(),
        ..Default::default()
    }
}

fn set_op(index: u32, object: &str) -> ResourceOperation {
    ResourceOperation {
        index,
        operation: "set".to_string(),
        object: object.to_string(),
        ..Default::default()
    }
}

/// Thermostat profile: readable scaled temperature plus a writable
/// bounded setpoint.
fn thermostat_profile() -> DeviceProfile {
    DeviceProfile {
        id: "prof-1".to_string(),
        name: "thermostat".to_string(),
        device_resources: vec![
            resource(
                "temperature",
                PropertyValue {
                    value_type: PropertyType::Int16,
                    read_write: "R".to_string(),
                    scale: Some(0.1),
                    ..Default::default()
                },
            ),
            resource(
                "setpoint",
                PropertyValue {
                    value_type: PropertyType::Int16,
                    read_write: "RW".to_string(),
                    minimum: Some(5.0),
                    maximum: Some(30.0),
                    ..Default::default()
                },
            ),
        ],
        resources: vec![
            ProfileResource {
                name: "temperature".to_string(),
                get: vec![get_op(0, "temperature")],
                set: vec![],
            },
            ProfileResource {
                name: "setpoint".to_string(),
                get: vec![get_op(0, "setpoint")],
                set: vec![set_op(0, "setpoint")],
            },
            ProfileResource {
                name: "readonly-write".to_string(),
                get: vec![],
                set: vec![set_op(0, "temperature")],
            },
        ],
        ..Default::default()
    }
}

struct Fixture {
    svc: Arc<DeviceService>,
    driver: Arc<MockDriver>,
    data: Arc<MockDataClient>,
}

async fn fixture() -> Fixture {
    let driver = Arc::new(MockDriver::new());
    let data = Arc::new(MockDataClient::new());
    let metadata = Arc::new(MockMetadataClient::new());
    let svc = DeviceService::new(
        "edgelink-test",
        "1.0.0",
        driver.clone(),
        Arc::new(NoopRestServer),
    )
    .unwrap();
    svc.set_platform_clients(data.clone(), metadata);
    svc.set_config(Config::default());
    svc.registry().add_profile(thermostat_profile()).await;
    svc.registry()
        .add(Device {
            id: "dev-1".to_string(),
            name: "therm1".to_string(),
            profile_name: "thermostat".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    Fixture { svc, driver, data }
}

#[tokio::test]
async fn get_applies_scale_transform() {
    let f = fixture().await;
    f.driver.set_reading("temperature", DeviceValue::Int16(500));

    let body = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();

    assert_eq!(body["temperature"], "50.0");

    // drain the pool so the event post completes
    f.svc.pool().shutdown(false).await;
    let events = f.data.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].device, "therm1");
    assert_eq!(events[0].readings.len(), 1);
    assert_eq!(events[0].readings[0].value, "50.0");
}

#[tokio::test]
async fn get_without_transform_returns_raw_value() {
    let f = fixture().await;
    f.driver.set_reading("temperature", DeviceValue::Int16(500));
    let mut config = Config::default();
    config.device.data_transform = false;
    f.svc.set_config(config);

    let body = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();

    assert_eq!(body["temperature"], "500");
}

#[tokio::test]
async fn put_on_locked_device_never_reaches_driver() {
    let f = fixture().await;
    f.svc
        .registry()
        .update(
            "therm1",
            edgelink_runtime::DeviceUpdate {
                admin_state: Some(AdminState::Locked),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "setpoint",
        CommandMethod::Put,
        Some(r#"{"setpoint":"21"}"#),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, SdkError::DeviceLocked(_)));
    assert_eq!(err.http_status(), 423);
    assert_eq!(f.driver.put_count(), 0);
}

#[tokio::test]
async fn put_writes_coerced_value() {
    let f = fixture().await;
    command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "setpoint",
        CommandMethod::Put,
        Some(r#"{"setpoint":"21"}"#),
    )
    .await
    .unwrap();

    assert_eq!(f.driver.put_count(), 1);
    assert_eq!(
        f.driver.writes(),
        vec![("setpoint".to_string(), DeviceValue::Int16(21))]
    );
}

#[tokio::test]
async fn put_enforces_minimum_and_maximum_inclusively() {
    let f = fixture().await;
    for (value, ok) in [("4", false), ("5", true), ("30", true), ("31", false)] {
        let result = command::execute(
            &f.svc,
            &DeviceSelector::Name("therm1".to_string()),
            "setpoint",
            CommandMethod::Put,
            Some(&format!(r#"{{"setpoint":"{value}"}}"#)),
        )
        .await;
        if ok {
            result.unwrap();
        } else {
            let err = result.unwrap_err();
            assert_eq!(err.http_status(), 400, "value {value}");
        }
    }
}

#[tokio::test]
async fn put_on_readonly_resource_is_rejected() {
    let f = fixture().await;
    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "readonly-write",
        CommandMethod::Put,
        Some(r#"{"temperature":"1"}"#),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::ResourceNotWritable(_)));
    assert_eq!(err.http_status(), 405);
    assert_eq!(f.driver.put_count(), 0);
}

#[tokio::test]
async fn unknown_device_and_command_are_404() {
    let f = fixture().await;
    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("nope".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 404);

    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "humidity",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn driver_failure_maps_to_bad_gateway() {
    let f = fixture().await;
    f.driver.fail_requests(true);
    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::DriverError(_)));
    assert_eq!(err.http_status(), 502);
}

#[tokio::test]
async fn reading_count_matches_get_operations() {
    let f = fixture().await;
    let mut profile = thermostat_profile();
    profile.resources.push(ProfileResource {
        name: "both".to_string(),
        get: vec![get_op(1, "setpoint"), get_op(0, "temperature")],
        set: vec![],
    });
    f.svc.registry().add_profile(profile).await;
    f.driver.set_reading("temperature", DeviceValue::Int16(500));
    f.driver.set_reading("setpoint", DeviceValue::Int16(21));

    let body = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "both",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();
    assert_eq!(body.as_object().unwrap().len(), 2);

    f.svc.pool().shutdown(false).await;
    let events = f.data.events();
    assert_eq!(events.len(), 1);
    // index order: temperature (0) before setpoint (1)
    assert_eq!(events[0].readings[0].name, "temperature");
    assert_eq!(events[0].readings[1].name, "setpoint");
}

#[tokio::test]
async fn assertion_failure_disables_device() {
    let f = fixture().await;
    let mut profile = thermostat_profile();
    profile.device_resources.push(resource(
        "status",
        PropertyValue {
            value_type: PropertyType::String,
            read_write: "R".to_string(),
            assertion: Some("ok".to_string()),
            ..Default::default()
        },
    ));
    profile.resources.push(ProfileResource {
        name: "status".to_string(),
        get: vec![get_op(0, "status")],
        set: vec![],
    });
    f.svc.registry().add_profile(profile).await;
    f.driver
        .set_reading("status", DeviceValue::String("fault".to_string()));

    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "status",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::AssertionFailed(_)));

    let device = f.svc.registry().get_by_name("therm1").await.unwrap();
    assert_eq!(device.op_state, OperatingState::Disabled);

    // subsequent commands are rejected with 423
    let err = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SdkError::DeviceDisabled(_)));
    assert_eq!(err.http_status(), 423);
}

#[tokio::test]
async fn all_selector_collects_partial_failures() {
    let f = fixture().await;
    f.driver.set_reading("temperature", DeviceValue::Int16(500));
    f.svc
        .registry()
        .add(Device {
            id: "dev-2".to_string(),
            name: "therm2".to_string(),
            profile_name: "thermostat".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    // a disabled device is skipped, not failed
    f.svc
        .registry()
        .add(Device {
            id: "dev-3".to_string(),
            name: "therm3".to_string(),
            profile_name: "thermostat".to_string(),
            op_state: OperatingState::Disabled,
            ..Default::default()
        })
        .await
        .unwrap();

    let body = command::execute(
        &f.svc,
        &DeviceSelector::All,
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);

    // now make every device fail
    f.driver.fail_requests(true);
    let err = command::execute(
        &f.svc,
        &DeviceSelector::All,
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn enumeration_mappings_remap_values() {
    let f = fixture().await;
    let mut profile = thermostat_profile();
    profile.device_resources.push(resource(
        "mode",
        PropertyValue {
            value_type: PropertyType::Uint8,
            read_write: "RW".to_string(),
            ..Default::default()
        },
    ));
    let mappings: std::collections::HashMap<String, String> = [
        ("0".to_string(), "off".to_string()),
        ("1".to_string(), "heat".to_string()),
    ]
    .into_iter()
    .collect();
    profile.resources.push(ProfileResource {
        name: "mode".to_string(),
        get: vec![ResourceOperation {
            index: 0,
            operation: "get".to_string(),
            object: "mode".to_string(),
            mappings: mappings.clone(),
            ..Default::default()
        }],
        set: vec![ResourceOperation {
            index: 0,
            operation: "set".to_string(),
            object: "mode".to_string(),
            mappings,
            ..Default::default()
        }],
    });
    f.svc.registry().add_profile(profile).await;
    f.driver.set_reading("mode", DeviceValue::Uint8(1));

    let body = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "mode",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();
    assert_eq!(body["mode"], "heat");

    command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "mode",
        CommandMethod::Put,
        Some(r#"{"mode":"off"}"#),
    )
    .await
    .unwrap();
    assert_eq!(
        f.driver.writes(),
        vec![("mode".to_string(), DeviceValue::Uint8(0))]
    );
}

#[tokio::test]
async fn event_post_failure_does_not_affect_response() {
    let f = fixture().await;
    f.driver.set_reading("temperature", DeviceValue::Int16(500));
    f.data.fail_posts(true);

    let body = command::execute(
        &f.svc,
        &DeviceSelector::Name("therm1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await
    .unwrap();
    assert_eq!(body["temperature"], "50.0");

    f.svc.pool().shutdown(false).await;
    assert!(f.data.events().is_empty());
}
