//! Command dispatcher.
//!
//! Turns a device selector, command name and method into driver calls and
//! readings. The HTTP handlers and the scheduler's self-invocations both
//! enter through [`execute`]/[`execute_path`], so a scheduled request goes
//! through exactly the same resolution, transform and event-emission steps
//! as an external one.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::warn;

use edgelink_core::models::{AdminState, Device, DeviceProfile, OperatingState};
use edgelink_core::{DeviceValue, SdkError};

use crate::driver::CommandRequest;
use crate::events;
use crate::service::DeviceService;
use crate::transform;

/// How a request names its target device(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Id(String),
    Name(String),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMethod {
    Get,
    Put,
}

/// Parse the path remainder after `/api/v1/device/` into a selector and a
/// command name. Accepts `name/<name>/<cmd>`, `id/<id>/<cmd>`,
/// `all/<cmd>` and the bare `<id>/<cmd>` form.
pub fn parse_device_path(path: &str) -> Result<(DeviceSelector, String), SdkError> {
    let parts: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        ["all", cmd] => Ok((DeviceSelector::All, (*cmd).to_string())),
        ["name", name, cmd] => Ok((DeviceSelector::Name((*name).to_string()), (*cmd).to_string())),
        ["id", id, cmd] => Ok((DeviceSelector::Id((*id).to_string()), (*cmd).to_string())),
        [id, cmd] => Ok((DeviceSelector::Id((*id).to_string()), (*cmd).to_string())),
        _ => Err(SdkError::HttpNotFound(format!("device path {path}"))),
    }
}

/// Execute a command given a raw path remainder. Entry point for the
/// scheduler's synthesized requests.
pub async fn execute_path(
    svc: &Arc<DeviceService>,
    path: &str,
    method: CommandMethod,
    body: Option<&str>,
) -> Result<Value, SdkError> {
    let (selector, command) = parse_device_path(path)?;
    execute(svc, &selector, &command, method, body).await
}

/// Execute a command against the selected device(s).
///
/// For `All`, every enabled device whose profile defines the command runs
/// in parallel on the worker pool; partial failure still succeeds as long
/// as one device does.
pub async fn execute(
    svc: &Arc<DeviceService>,
    selector: &DeviceSelector,
    command: &str,
    method: CommandMethod,
    body: Option<&str>,
) -> Result<Value, SdkError> {
    match selector {
        DeviceSelector::Id(id) => {
            let device = svc
                .registry()
                .get_by_id(id)
                .await
                .ok_or_else(|| SdkError::HttpNotFound(format!("device {id}")))?;
            execute_for_device(svc.clone(), device, command.to_string(), method, body.map(str::to_string)).await
        }
        DeviceSelector::Name(name) => {
            let device = svc
                .registry()
                .get_by_name(name)
                .await
                .ok_or_else(|| SdkError::HttpNotFound(format!("device {name}")))?;
            execute_for_device(svc.clone(), device, command.to_string(), method, body.map(str::to_string)).await
        }
        DeviceSelector::All => execute_all(svc, command, method, body).await,
    }
}

async fn execute_all(
    svc: &Arc<DeviceService>,
    command: &str,
    method: CommandMethod,
    body: Option<&str>,
) -> Result<Value, SdkError> {
    let mut targets = Vec::new();
    for device in svc.registry().list().await {
        if device.op_state != OperatingState::Enabled {
            continue;
        }
        let defines_command = svc
            .registry()
            .get_profile(&device.profile_name)
            .await
            .map(|p| p.command(command).is_some())
            .unwrap_or(false);
        if defines_command {
            targets.push(device);
        }
    }
    if targets.is_empty() {
        return Err(SdkError::HttpNotFound(format!(
            "no enabled device supports command {command}"
        )));
    }

    let pool = svc.pool();
    let mut pending = Vec::with_capacity(targets.len());
    for device in targets {
        let (tx, rx) = oneshot::channel();
        let svc = svc.clone();
        let command = command.to_string();
        let body = body.map(str::to_string);
        let name = device.name.clone();
        pool.submit(async move {
            let result = execute_for_device(svc, device, command, method, body).await;
            let _ = tx.send(result);
        });
        pending.push((name, rx));
    }

    let mut bodies = Vec::new();
    let mut failures = 0usize;
    for (name, rx) in pending {
        match rx.await {
            Ok(Ok(body)) => bodies.push(body),
            Ok(Err(err)) => {
                failures += 1;
                warn!(device = %name, %err, "command failed");
            }
            Err(_) => {
                failures += 1;
                warn!(device = %name, "command worker dropped");
            }
        }
    }
    if bodies.is_empty() {
        return Err(SdkError::AllDevicesFailed(format!(
            "{command} ({failures} failures)"
        )));
    }
    Ok(Value::Array(bodies))
}

async fn execute_for_device(
    svc: Arc<DeviceService>,
    device: Device,
    command: String,
    method: CommandMethod,
    body: Option<String>,
) -> Result<Value, SdkError> {
    if device.admin_state == AdminState::Locked {
        return Err(SdkError::DeviceLocked(device.name));
    }
    if device.op_state == OperatingState::Disabled {
        return Err(SdkError::DeviceDisabled(device.name));
    }
    let profile = svc
        .registry()
        .get_profile(&device.profile_name)
        .await
        .ok_or_else(|| SdkError::ProfileNotFound(device.profile_name.clone()))?;
    let cmd = profile
        .command(&command)
        .ok_or_else(|| SdkError::HttpNotFound(format!("command {command}")))?
        .clone();

    match method {
        CommandMethod::Get => {
            let requests = build_requests(&profile, &cmd.get, false)?;
            run_get(&svc, &device, &requests).await
        }
        CommandMethod::Put => {
            let requests = build_requests(&profile, &cmd.set, true)?;
            run_put(&svc, &device, &requests, body.as_deref()).await
        }
    }
}

/// Resolve the operations of a command into request pairs, ordered by
/// operation index. A set on a read-only resource is rejected here, before
/// the driver is involved.
fn build_requests(
    profile: &DeviceProfile,
    ops: &[edgelink_core::models::ResourceOperation],
    writing: bool,
) -> Result<Vec<CommandRequest>, SdkError> {
    let mut ops: Vec<_> = ops.to_vec();
    ops.sort_by_key(|op| op.index);
    if ops.is_empty() {
        return Err(SdkError::HttpNotFound(if writing {
            "command has no set operations".to_string()
        } else {
            "command has no get operations".to_string()
        }));
    }
    ops.into_iter()
        .map(|op| {
            let resource = profile.resource(&op.object).ok_or_else(|| {
                SdkError::BadConfig(format!(
                    "profile {} references unknown resource {}",
                    profile.name, op.object
                ))
            })?;
            if writing && !resource.properties.value.writable() {
                return Err(SdkError::ResourceNotWritable(resource.name.clone()));
            }
            Ok(CommandRequest {
                operation: op,
                resource: resource.clone(),
            })
        })
        .collect()
}

async fn run_get(
    svc: &Arc<DeviceService>,
    device: &Device,
    requests: &[CommandRequest],
) -> Result<Value, SdkError> {
    let results = svc
        .driver()
        .handle_get(&device.addressable, requests)
        .await
        .map_err(|err| SdkError::DriverError(err.to_string()))?;
    if results.len() != requests.len() {
        return Err(SdkError::DriverError(format!(
            "driver returned {} results for {} requests",
            results.len(),
            requests.len()
        )));
    }

    let readings = match events::build_readings(requests, &results, svc.data_transform()) {
        Ok(readings) => readings,
        Err(err @ SdkError::AssertionFailed(_)) => {
            svc.registry().disable(&device.id).await;
            warn!(device = %device.name, %err, "assertion failed, device disabled");
            return Err(err);
        }
        Err(err) => return Err(err),
    };

    let mut map = serde_json::Map::new();
    for reading in &readings {
        map.insert(reading.name.clone(), json!(reading.value));
    }
    if let Ok(data) = svc.data_client() {
        events::publish(&svc.pool(), data, &device.name, readings);
    }
    Ok(Value::Object(map))
}

async fn run_put(
    svc: &Arc<DeviceService>,
    device: &Device,
    requests: &[CommandRequest],
    body: Option<&str>,
) -> Result<Value, SdkError> {
    let body = body.ok_or_else(|| SdkError::InvalidArg("missing request body".to_string()))?;
    let fields: HashMap<String, Value> = serde_json::from_str(body)
        .map_err(|e| SdkError::InvalidArg(format!("malformed body: {e}")))?;

    for key in fields.keys() {
        if !requests.iter().any(|r| r.operation.object == *key) {
            warn!(device = %device.name, resource = %key, "ignoring unknown resource in body");
        }
    }

    let transform_enabled = svc.data_transform();
    let mut values = Vec::with_capacity(requests.len());
    for req in requests {
        let props = &req.resource.properties.value;
        let raw = match fields.get(&req.operation.object) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None if !req.operation.parameter.is_empty() => req.operation.parameter.clone(),
            None => {
                return Err(SdkError::InvalidArg(format!(
                    "no value supplied for resource {}",
                    req.operation.object
                )))
            }
        };
        let raw = transform::map_incoming(raw, &req.operation.mappings);
        let value = DeviceValue::parse(props.value_type, &raw)?;
        if let Some(v) = value.as_f64() {
            if let Some(min) = props.minimum {
                if v < min {
                    return Err(SdkError::InvalidArg(format!(
                        "{} below minimum {min}",
                        req.resource.name
                    )));
                }
            }
            if let Some(max) = props.maximum {
                if v > max {
                    return Err(SdkError::InvalidArg(format!(
                        "{} above maximum {max}",
                        req.resource.name
                    )));
                }
            }
        }
        let value = if transform_enabled {
            transform::incoming(value, props)
        } else {
            value
        };
        values.push(value);
    }

    svc.driver()
        .handle_put(&device.addressable, requests, &values)
        .await
        .map_err(|err| SdkError::DriverError(err.to_string()))?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_forms() {
        assert_eq!(
            parse_device_path("name/therm1/temperature").unwrap(),
            (
                DeviceSelector::Name("therm1".to_string()),
                "temperature".to_string()
            )
        );
        assert_eq!(
            parse_device_path("all/temperature").unwrap(),
            (DeviceSelector::All, "temperature".to_string())
        );
        assert_eq!(
            parse_device_path("id/abc-123/flow").unwrap(),
            (DeviceSelector::Id("abc-123".to_string()), "flow".to_string())
        );
        assert_eq!(
            parse_device_path("abc-123/flow").unwrap(),
            (DeviceSelector::Id("abc-123".to_string()), "flow".to_string())
        );
        assert!(parse_device_path("just-one-segment").is_err());
        assert!(parse_device_path("a/b/c/d").is_err());
    }
}
