//! Virtual device adapter example.
//!
//! Runs the full runtime against a scripted driver and in-memory platform
//! clients: no external services are needed. Demonstrates:
//! 1. Supplying a driver and server implementation at construction
//! 2. Seeding a profile and a device
//! 3. Executing a read command through the dispatcher
//! 4. Clean shutdown

use std::sync::Arc;

use edgelink_core::config::Config;
use edgelink_core::models::{
    Device, DeviceProfile, DeviceResource, ProfileResource, PropertyValue, ResourceOperation,
    ResourceProperties,
};
use edgelink_core::{DeviceValue, PropertyType};
use edgelink_runtime::clients::mock::{MockDataClient, MockMetadataClient};
use edgelink_runtime::command::{self, CommandMethod, DeviceSelector};
use edgelink_runtime::{DeviceService, MockDriver, NoopRestServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== edgelink virtual adapter demo ===\n");

    let driver = Arc::new(MockDriver::new());
    driver.set_reading("temperature", DeviceValue::Int16(235));

    let data = Arc::new(MockDataClient::new());
    let svc = DeviceService::new(
        "virtual-adapter",
        env!("CARGO_PKG_VERSION"),
        driver,
        Arc::new(NoopRestServer),
    )?;
    svc.set_platform_clients(data.clone(), Arc::new(MockMetadataClient::new()));
    svc.set_config(Config::default());

    // A profile with one scaled temperature resource.
    svc.registry()
        .add_profile(DeviceProfile {
            id: "profile-1".to_string(),
            name: "virtual-thermometer".to_string(),
            device_resources: vec![DeviceResource {
                name: "temperature".to_string(),
                properties: ResourceProperties {
                    value: PropertyValue {
                        value_type: PropertyType::Int16,
                        read_write: "R".to_string(),
                        scale: Some(0.1),
                        ..Default::default()
                    },
                    units: Some("celsius".to_string()),
                },
                ..Default::default()
            }],
            resources: vec![ProfileResource {
                name: "temperature".to_string(),
                get: vec![ResourceOperation {
                    index: 0,
                    operation: "get".to_string(),
                    object: "temperature".to_string(),
                    ..Default::default()
                }],
                set: vec![],
            }],
            ..Default::default()
        })
        .await;

    svc.registry()
        .add(Device {
            id: "virtual-1".to_string(),
            name: "thermometer-1".to_string(),
            profile_name: "virtual-thermometer".to_string(),
            ..Default::default()
        })
        .await?;

    // Read the temperature command: the raw 235 becomes 23.5 after the
    // 0.1 scale transform.
    let body = command::execute(
        &svc,
        &DeviceSelector::Name("thermometer-1".to_string()),
        "temperature",
        CommandMethod::Get,
        None,
    )
    .await?;
    println!("reading: {body}");

    svc.stop(false).await;
    println!("events posted to the data service: {}", data.events().len());
    Ok(())
}
