//! Service configuration.
//!
//! Configuration is read either from a local TOML file or from a
//! configuration registry as flat name/value pairs; both forms map onto
//! [`Config`]. Section and key names follow the platform convention
//! (`Service.Port`, `Clients.Data.Host`, ...).

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// `[Service]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
    /// Delay between connection attempts, milliseconds.
    pub timeout: u64,
    pub connect_retries: u32,
    /// Registry health-check interval, e.g. "10s". Empty disables the check.
    pub check_interval: String,
    pub labels: Vec<String>,
    pub startup_msg: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 49990,
            timeout: 5000,
            connect_retries: 10,
            check_interval: String::new(),
            labels: Vec::new(),
            startup_msg: String::new(),
        }
    }
}

/// One entry of the `[Clients]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for ClientEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
        }
    }
}

impl ClientEndpoint {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// `[Clients]` section: the platform data and metadata services.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ClientsSettings {
    pub data: ClientEndpoint,
    pub metadata: ClientEndpoint,
}

/// `[Device]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceSettings {
    pub profiles_dir: String,
    pub data_transform: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            profiles_dir: String::new(),
            data_transform: true,
        }
    }
}

/// `[Logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoggingSettings {
    pub file: String,
    #[serde(rename = "RemoteURL")]
    pub remote_url: String,
}

/// `[ScheduleEvents.<name>]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ScheduleEventSettings {
    pub schedule: String,
    pub path: String,
}

/// `[[DeviceList]]` entry: a device created at startup if absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceListEntry {
    pub name: String,
    pub profile: String,
    pub description: String,
    pub labels: Vec<String>,
    pub addressable: AddressableSettings,
}

/// Addressable block of a `[[DeviceList]]` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AddressableSettings {
    pub name: String,
    pub protocol: String,
    pub method: String,
    pub address: String,
    pub port: u16,
    pub path: String,
}

/// Complete configuration surface of an adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Config {
    pub service: ServiceSettings,
    pub clients: ClientsSettings,
    pub device: DeviceSettings,
    pub logging: LoggingSettings,
    /// Opaque name/value pairs handed to the driver's `initialize`.
    pub driver: HashMap<String, String>,
    /// Schedule name -> ISO-8601 frequency.
    pub schedules: HashMap<String, String>,
    pub schedule_events: HashMap<String, ScheduleEventSettings>,
    pub device_list: Vec<DeviceListEntry>,
}

impl Config {
    /// Load configuration from `<dir>/configuration.toml`, or
    /// `<dir>/configuration-<profile>.toml` when a profile is given.
    pub fn load(dir: &str, profile: Option<&str>) -> Result<Self, SdkError> {
        let file = match profile {
            Some(p) if !p.is_empty() => format!("configuration-{p}.toml"),
            _ => "configuration.toml".to_string(),
        };
        let path = Path::new(dir).join(file);
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw)
            .map_err(|e| SdkError::BadConfig(format!("{}: {e}", path.display())))
    }

    /// Rebuild configuration from the registry's flat name/value form.
    ///
    /// Unrecognized keys are logged and skipped. `DeviceList` is only
    /// expressible in the TOML form and never round-trips through a
    /// registry.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self, SdkError> {
        let mut cfg = Config::default();
        for (key, value) in pairs {
            let parts: Vec<&str> = key.split('.').collect();
            let parse_err =
                |k: &str| SdkError::BadConfig(format!("bad value for configuration key {k}"));
            match parts.as_slice() {
                ["Service", "Host"] => cfg.service.host = value.clone(),
                ["Service", "Port"] => {
                    cfg.service.port = value.parse().map_err(|_| parse_err(key))?
                }
                ["Service", "Timeout"] => {
                    cfg.service.timeout = value.parse().map_err(|_| parse_err(key))?
                }
                ["Service", "ConnectRetries"] => {
                    cfg.service.connect_retries = value.parse().map_err(|_| parse_err(key))?
                }
                ["Service", "CheckInterval"] => cfg.service.check_interval = value.clone(),
                ["Service", "Labels"] => {
                    cfg.service.labels = value
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                ["Service", "StartupMsg"] => cfg.service.startup_msg = value.clone(),
                ["Clients", "Data", "Host"] => cfg.clients.data.host = value.clone(),
                ["Clients", "Data", "Port"] => {
                    cfg.clients.data.port = value.parse().map_err(|_| parse_err(key))?
                }
                ["Clients", "Metadata", "Host"] => cfg.clients.metadata.host = value.clone(),
                ["Clients", "Metadata", "Port"] => {
                    cfg.clients.metadata.port = value.parse().map_err(|_| parse_err(key))?
                }
                ["Device", "ProfilesDir"] => cfg.device.profiles_dir = value.clone(),
                ["Device", "DataTransform"] => {
                    cfg.device.data_transform = value.parse().map_err(|_| parse_err(key))?
                }
                ["Logging", "File"] => cfg.logging.file = value.clone(),
                ["Logging", "RemoteURL"] => cfg.logging.remote_url = value.clone(),
                ["Driver", name] => {
                    cfg.driver.insert((*name).to_string(), value.clone());
                }
                ["Schedules", name] => {
                    cfg.schedules.insert((*name).to_string(), value.clone());
                }
                ["ScheduleEvents", name, "Schedule"] => {
                    cfg.schedule_events
                        .entry((*name).to_string())
                        .or_default()
                        .schedule = value.clone()
                }
                ["ScheduleEvents", name, "Path"] => {
                    cfg.schedule_events
                        .entry((*name).to_string())
                        .or_default()
                        .path = value.clone()
                }
                _ => tracing::warn!(%key, "ignoring unrecognized configuration key"),
            }
        }
        Ok(cfg)
    }

    /// Flatten to the registry's name/value form (inverse of
    /// [`Config::from_pairs`], modulo `DeviceList`).
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Service.Host".to_string(), self.service.host.clone()),
            ("Service.Port".to_string(), self.service.port.to_string()),
            ("Service.Timeout".to_string(), self.service.timeout.to_string()),
            (
                "Service.ConnectRetries".to_string(),
                self.service.connect_retries.to_string(),
            ),
            (
                "Service.CheckInterval".to_string(),
                self.service.check_interval.clone(),
            ),
            ("Service.Labels".to_string(), self.service.labels.join(",")),
            ("Service.StartupMsg".to_string(), self.service.startup_msg.clone()),
            ("Clients.Data.Host".to_string(), self.clients.data.host.clone()),
            ("Clients.Data.Port".to_string(), self.clients.data.port.to_string()),
            (
                "Clients.Metadata.Host".to_string(),
                self.clients.metadata.host.clone(),
            ),
            (
                "Clients.Metadata.Port".to_string(),
                self.clients.metadata.port.to_string(),
            ),
            ("Device.ProfilesDir".to_string(), self.device.profiles_dir.clone()),
            (
                "Device.DataTransform".to_string(),
                self.device.data_transform.to_string(),
            ),
            ("Logging.File".to_string(), self.logging.file.clone()),
            ("Logging.RemoteURL".to_string(), self.logging.remote_url.clone()),
        ];
        for (k, v) in &self.driver {
            pairs.push((format!("Driver.{k}"), v.clone()));
        }
        for (k, v) in &self.schedules {
            pairs.push((format!("Schedules.{k}"), v.clone()));
        }
        for (k, v) in &self.schedule_events {
            pairs.push((format!("ScheduleEvents.{k}.Schedule"), v.schedule.clone()));
            pairs.push((format!("ScheduleEvents.{k}.Path"), v.path.clone()));
        }
        pairs
    }
}

/// Parse an ISO-8601 duration of the `PT<n>H<n>M<n>S` family into a
/// [`Duration`]. Date components are not supported.
pub fn parse_iso8601_duration(s: &str) -> Result<Duration, SdkError> {
    let bad = || SdkError::BadConfig(format!("'{s}' is not a valid ISO-8601 duration"));
    let body = s.strip_prefix("PT").or_else(|| s.strip_prefix("pt")).ok_or_else(bad)?;
    if body.is_empty() {
        return Err(bad());
    }
    let mut secs: u64 = 0;
    let mut digits = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let n: u64 = digits.parse().map_err(|_| bad())?;
        digits.clear();
        secs += match c.to_ascii_uppercase() {
            'H' => n * 3600,
            'M' => n * 60,
            'S' => n,
            _ => return Err(bad()),
        };
    }
    if !digits.is_empty() {
        return Err(bad());
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [Service]
        Host = "edge-host"
        Port = 49990
        Timeout = 500
        ConnectRetries = 3
        Labels = ["modbus", "industrial"]
        StartupMsg = "adapter started"

        [Clients.Data]
        Host = "platform-data"
        Port = 48080

        [Clients.Metadata]
        Host = "platform-metadata"
        Port = 48081

        [Device]
        ProfilesDir = "res/profiles"
        DataTransform = true

        [Driver]
        SerialPort = "/dev/ttyUSB0"

        [Schedules]
        5sec = "PT5S"

        [ScheduleEvents.pump-flow]
        Schedule = "5sec"
        Path = "/api/v1/device/name/pump/flow"

        [[DeviceList]]
        Name = "pump"
        Profile = "pump-profile"
        Description = "Main circulation pump"

        [DeviceList.Addressable]
        Address = "10.0.0.5"
        Port = 502
    "#;

    #[test]
    fn toml_round_trip() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.service.port, 49990);
        assert_eq!(cfg.service.connect_retries, 3);
        assert_eq!(cfg.clients.metadata.port, 48081);
        assert_eq!(cfg.device.profiles_dir, "res/profiles");
        assert_eq!(cfg.driver["SerialPort"], "/dev/ttyUSB0");
        assert_eq!(cfg.schedules["5sec"], "PT5S");
        assert_eq!(
            cfg.schedule_events["pump-flow"].path,
            "/api/v1/device/name/pump/flow"
        );
        assert_eq!(cfg.device_list.len(), 1);
        assert_eq!(cfg.device_list[0].addressable.port, 502);
    }

    #[test]
    fn pairs_round_trip() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        let rebuilt = Config::from_pairs(&cfg.to_pairs()).unwrap();
        assert_eq!(rebuilt.service, cfg.service);
        assert_eq!(rebuilt.clients, cfg.clients);
        assert_eq!(rebuilt.device, cfg.device);
        assert_eq!(rebuilt.driver, cfg.driver);
        assert_eq!(rebuilt.schedules, cfg.schedules);
        assert_eq!(rebuilt.schedule_events, cfg.schedule_events);
        // DeviceList intentionally does not survive the flat form.
        assert!(rebuilt.device_list.is_empty());
    }

    #[test]
    fn iso8601_durations() {
        assert_eq!(parse_iso8601_duration("PT2S").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_iso8601_duration("PT5M").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_iso8601_duration("PT1H").unwrap(), Duration::from_secs(3600));
        assert_eq!(
            parse_iso8601_duration("PT1H30M15S").unwrap(),
            Duration::from_secs(5415)
        );
        assert!(parse_iso8601_duration("P1D").is_err());
        assert!(parse_iso8601_duration("PT").is_err());
        assert!(parse_iso8601_duration("PT5").is_err());
    }

    #[test]
    fn defaults_apply() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.device.data_transform);
        assert_eq!(cfg.service.connect_retries, 10);
        assert_eq!(cfg.service.timeout, 5000);
    }
}
