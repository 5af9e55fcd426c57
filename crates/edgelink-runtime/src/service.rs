//! Service lifecycle orchestrator.
//!
//! [`DeviceService`] owns every subsystem: registry, driver, worker pool,
//! scheduler, platform clients and the REST surface. [`DeviceService::start`]
//! walks the startup state machine
//!
//! ```text
//! INIT -> CONFIG_LOADED -> PLATFORM_READY -> REGISTERED
//!      -> PROFILES_UPLOADED -> DEVICES_LOADED -> SERVING -> SCHEDULED
//! ```
//!
//! and any failure aborts startup; the embedder then tears partial state
//! down with `stop(force = true)`. Shutdown releases subsystems in reverse
//! order of startup.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use edgelink_core::config::{parse_iso8601_duration, Config, LoggingSettings};
use edgelink_core::models::{
    now_ms, Addressable, AdminState, Device, DeviceProfile, DeviceServiceRecord,
    OperatingState, ScheduleEvent,
};
use edgelink_core::SdkError;

use crate::clients::http::{HttpConfigRegistry, HttpDataClient, HttpMetadataClient};
use crate::clients::{ConfigRegistry, DataClient, MetadataClient};
use crate::command::{self, CommandMethod};
use crate::discovery;
use crate::driver::{CommandRequest, CommandResult, ProtocolDriver};
use crate::events;
use crate::pool::WorkerPool;
use crate::registry::{DeviceRegistry, DeviceUpdate};
use crate::scheduler::{ScheduledTask, Scheduler, TaskAction};

pub const API_DEVICE_PREFIX: &str = "/api/v1/device/";
pub const API_DISCOVERY: &str = "/api/v1/discovery";
pub const API_CALLBACK: &str = "/api/v1/callback";

/// Attempts made waiting for a configuration registry, one second apart.
const REGISTRY_RETRIES: u32 = 5;

/// Startup progress of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Init,
    ConfigLoaded,
    PlatformReady,
    Registered,
    ProfilesUploaded,
    DevicesLoaded,
    Serving,
    Scheduled,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Embedded HTTP server collaborator. The runtime drives its lifecycle;
/// the implementation routes requests back into the service.
#[async_trait]
pub trait RestServer: Send + Sync {
    async fn start(&self, svc: Arc<DeviceService>, port: u16) -> Result<(), SdkError>;
    async fn stop(&self);
}

/// Server stub for embedders that expose no northbound API (tests,
/// embedded use).
pub struct NoopRestServer;

#[async_trait]
impl RestServer for NoopRestServer {
    async fn start(&self, _svc: Arc<DeviceService>, _port: u16) -> Result<(), SdkError> {
        Ok(())
    }

    async fn stop(&self) {}
}

/// A device-adapter service instance.
pub struct DeviceService {
    name: String,
    version: String,
    driver: Arc<dyn ProtocolDriver>,
    rest: Arc<dyn RestServer>,
    registry: DeviceRegistry,
    pool: Arc<WorkerPool>,
    scheduler: Scheduler,
    config: std::sync::RwLock<Config>,
    state: std::sync::RwLock<ServiceState>,
    data: std::sync::RwLock<Option<Arc<dyn DataClient>>>,
    metadata: std::sync::RwLock<Option<Arc<dyn MetadataClient>>>,
    config_registry: std::sync::RwLock<Option<Arc<dyn ConfigRegistry>>>,
    discovery_guard: Arc<tokio::sync::Mutex<()>>,
    service_id: std::sync::RwLock<String>,
}

impl DeviceService {
    /// Create a service. The driver and server are fixed for the lifetime
    /// of the instance; platform clients default to HTTP implementations
    /// built from configuration at startup.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        driver: Arc<dyn ProtocolDriver>,
        rest: Arc<dyn RestServer>,
    ) -> Result<Arc<Self>, SdkError> {
        let name = name.into();
        let version = version.into();
        if name.is_empty() {
            return Err(SdkError::NoDeviceName);
        }
        if version.is_empty() {
            return Err(SdkError::NoDeviceVersion);
        }
        Ok(Arc::new(Self {
            name,
            version,
            driver,
            rest,
            registry: DeviceRegistry::new(),
            pool: Arc::new(WorkerPool::default()),
            scheduler: Scheduler::new(),
            config: std::sync::RwLock::new(Config::default()),
            state: std::sync::RwLock::new(ServiceState::Init),
            data: std::sync::RwLock::new(None),
            metadata: std::sync::RwLock::new(None),
            config_registry: std::sync::RwLock::new(None),
            discovery_guard: Arc::new(tokio::sync::Mutex::new(())),
            service_id: std::sync::RwLock::new(String::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read().unwrap()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn driver(&self) -> Arc<dyn ProtocolDriver> {
        self.driver.clone()
    }

    pub fn pool(&self) -> Arc<WorkerPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> Config {
        self.config.read().unwrap().clone()
    }

    pub fn data_transform(&self) -> bool {
        self.config.read().unwrap().device.data_transform
    }

    pub(crate) fn discovery_guard(&self) -> Arc<tokio::sync::Mutex<()>> {
        self.discovery_guard.clone()
    }

    pub fn data_client(&self) -> Result<Arc<dyn DataClient>, SdkError> {
        self.data
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| SdkError::DataClientFail("data client not configured".to_string()))
    }

    pub fn metadata_client(&self) -> Result<Arc<dyn MetadataClient>, SdkError> {
        self.metadata.read().unwrap().clone().ok_or_else(|| {
            SdkError::MetadataClientFail("metadata client not configured".to_string())
        })
    }

    /// Inject platform clients ahead of `start`, overriding the HTTP
    /// defaults. Used by embedders and the test suites.
    pub fn set_platform_clients(
        &self,
        data: Arc<dyn DataClient>,
        metadata: Arc<dyn MetadataClient>,
    ) {
        *self.data.write().unwrap() = Some(data);
        *self.metadata.write().unwrap() = Some(metadata);
    }

    pub fn set_config_registry(&self, registry: Arc<dyn ConfigRegistry>) {
        *self.config_registry.write().unwrap() = Some(registry);
    }

    /// Replace the effective configuration. For embedders that resolve
    /// configuration themselves instead of going through `start`'s file or
    /// registry path.
    pub fn set_config(&self, config: Config) {
        *self.config.write().unwrap() = config;
    }

    fn config_registry_client(&self) -> Option<Arc<dyn ConfigRegistry>> {
        self.config_registry.read().unwrap().clone()
    }

    fn set_state(&self, state: ServiceState) {
        *self.state.write().unwrap() = state;
        debug!(%state, "service state");
    }

    /// Bring the service into operation. See the module docs for the state
    /// machine; any error leaves the service partially started and the
    /// caller is expected to invoke [`DeviceService::stop`] with force.
    pub async fn start(
        self: &Arc<Self>,
        registry_url: Option<&str>,
        profile: Option<&str>,
        conf_dir: &str,
    ) -> Result<(), SdkError> {
        let conf_dir = if conf_dir.is_empty() { "res" } else { conf_dir };
        self.resolve_config(registry_url, profile, conf_dir).await?;
        self.set_state(ServiceState::ConfigLoaded);

        let config = self.config();
        init_logging(&config.logging);
        info!(service = %self.name, version = %self.version, "starting device service");
        debug!(?config, "effective configuration");

        if self.data.read().unwrap().is_none() {
            *self.data.write().unwrap() = Some(Arc::new(HttpDataClient::new(
                config.clients.data.base_url(),
            )));
        }
        if self.metadata.read().unwrap().is_none() {
            *self.metadata.write().unwrap() = Some(Arc::new(HttpMetadataClient::new(
                config.clients.metadata.base_url(),
            )));
        }

        self.await_platform(&config).await?;
        self.set_state(ServiceState::PlatformReady);

        self.register(&config).await?;
        self.set_state(ServiceState::Registered);

        self.upload_profiles(&config).await?;
        self.set_state(ServiceState::ProfilesUploaded);

        self.load_devices(&config).await?;
        self.set_state(ServiceState::DevicesLoaded);

        self.driver
            .initialize(&config.driver)
            .await
            .map_err(|err| SdkError::DriverUnstart(err.to_string()))?;
        self.rest.start(self.clone(), config.service.port).await?;
        self.set_state(ServiceState::Serving);

        self.create_schedules(&config).await?;
        self.register_schedule_tasks().await?;
        self.scheduler.start(self.pool());
        if let Some(registry) = self.config_registry_client() {
            if !config.service.check_interval.is_empty() {
                registry
                    .register_service(
                        &self.name,
                        &config.service.host,
                        config.service.port,
                        &config.service.check_interval,
                    )
                    .await?;
            }
        }
        self.set_state(ServiceState::Scheduled);

        if !config.service.startup_msg.is_empty() {
            info!("{}", config.service.startup_msg);
        }
        Ok(())
    }

    /// Stop the service, releasing subsystems in reverse startup order.
    /// A graceful stop drains pending event posts; a forced one abandons
    /// them.
    pub async fn stop(&self, force: bool) {
        info!(force, "stopping device service");
        self.scheduler.stop().await;
        self.rest.stop().await;
        self.driver.stop(force).await;
        self.pool.shutdown(force).await;
        self.registry.clear().await;
        self.set_state(ServiceState::Init);
        info!("device service stopped");
    }

    // ========== Startup phases ==========

    async fn resolve_config(
        self: &Arc<Self>,
        registry_url: Option<&str>,
        profile: Option<&str>,
        conf_dir: &str,
    ) -> Result<(), SdkError> {
        let mut upload_config = false;
        if let Some(url) = registry_url {
            if self.config_registry_client().is_none() {
                self.set_config_registry(Arc::new(HttpConfigRegistry::new(url)));
            }
            let registry = self
                .config_registry_client()
                .ok_or_else(|| SdkError::InvalidArg("registry client missing".to_string()))?;
            let mut reachable = false;
            for _ in 0..REGISTRY_RETRIES {
                if registry.ping().await.is_ok() {
                    reachable = true;
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            if !reachable {
                error!("configuration registry not running");
                return Err(SdkError::RemoteServerDown(
                    "configuration registry".to_string(),
                ));
            }
            match registry.get_config(&self.name, profile).await? {
                Some(pairs) => {
                    *self.config.write().unwrap() = Config::from_pairs(&pairs)?;
                }
                None => {
                    info!("no configuration in registry, loading from file");
                    upload_config = true;
                }
            }
        }
        if registry_url.is_none() || upload_config {
            let config = Config::load(conf_dir, profile)?;
            if upload_config {
                if let Some(registry) = self.config_registry_client() {
                    info!("uploading configuration to registry");
                    registry
                        .put_config(&self.name, profile, &config.to_pairs())
                        .await?;
                }
            }
            *self.config.write().unwrap() = config;
        }
        let mut config = self.config.write().unwrap();
        if config.device.profiles_dir.is_empty() {
            config.device.profiles_dir = conf_dir.to_string();
        }
        Ok(())
    }

    /// Wait for the data and metadata services, each pinged up to
    /// `ConnectRetries` times with `Timeout` milliseconds between
    /// attempts.
    async fn await_platform(&self, config: &Config) -> Result<(), SdkError> {
        let delay = Duration::from_millis(config.service.timeout);
        let retries = config.service.connect_retries.max(1);

        let data = self.data_client()?;
        let mut ok = false;
        for _ in 0..retries {
            if data.ping().await.is_ok() {
                ok = true;
                break;
            }
            tokio::time::sleep(delay).await;
        }
        if !ok {
            error!("data service not running");
            return Err(SdkError::RemoteServerDown("data service".to_string()));
        }

        let metadata = self.metadata_client()?;
        let mut ok = false;
        for _ in 0..retries {
            if metadata.ping().await.is_ok() {
                ok = true;
                break;
            }
            tokio::time::sleep(delay).await;
        }
        if !ok {
            error!("metadata service not running");
            return Err(SdkError::RemoteServerDown("metadata service".to_string()));
        }
        Ok(())
    }

    /// Fetch or create this adapter's metadata record: an addressable
    /// pointing at the callback endpoint plus the device-service entry.
    async fn register(&self, config: &Config) -> Result<(), SdkError> {
        let metadata = self.metadata_client()?;
        let id = match metadata.get_device_service(&self.name).await? {
            Some(record) => record.id,
            None => {
                let addressable = match metadata.get_addressable(&self.name).await? {
                    Some(addr) => addr,
                    None => {
                        let mut addr = Addressable::new(&self.name)
                            .with_method("POST")
                            .with_location(config.service.host.clone(), config.service.port)
                            .with_path(API_CALLBACK);
                        addr.id = metadata.create_addressable(&addr).await?;
                        addr
                    }
                };
                let record = DeviceServiceRecord {
                    id: String::new(),
                    name: self.name.clone(),
                    addressable,
                    admin_state: AdminState::Unlocked,
                    op_state: OperatingState::Enabled,
                    labels: config.service.labels.clone(),
                    origin: now_ms(),
                };
                match metadata.create_device_service(&record).await {
                    Ok(id) => id,
                    Err(SdkError::HttpConflict(_)) => metadata
                        .get_device_service(&self.name)
                        .await?
                        .map(|r| r.id)
                        .unwrap_or_default(),
                    Err(err) => return Err(err),
                }
            }
        };
        *self.service_id.write().unwrap() = id;
        Ok(())
    }

    /// Scan the profiles directory and upload any profile metadata does
    /// not know yet. Conflicts mean another instance won the race and are
    /// benign.
    async fn upload_profiles(&self, config: &Config) -> Result<(), SdkError> {
        let metadata = self.metadata_client()?;
        let dir = Path::new(&config.device.profiles_dir);
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "profiles directory not readable");
                return Ok(());
            }
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            let mut profile: DeviceProfile = serde_json::from_str(&raw)
                .map_err(|e| SdkError::BadConfig(format!("{}: {e}", path.display())))?;
            match metadata.get_profile(&profile.name).await? {
                Some(existing) => {
                    debug!(profile = %existing.name, "profile already in metadata");
                    self.registry.add_profile(existing).await;
                }
                None => match metadata.upload_profile(&profile).await {
                    Ok(id) => {
                        info!(profile = %profile.name, "uploaded device profile");
                        profile.id = id;
                        self.registry.add_profile(profile).await;
                    }
                    Err(SdkError::HttpConflict(_)) => {
                        info!(profile = %profile.name, "skipping already existing profile");
                        self.registry.add_profile(profile).await;
                    }
                    Err(err) => return Err(err),
                },
            }
        }
        Ok(())
    }

    /// Pull every device metadata attributes to this service into the
    /// registry, then create the configured devices that do not exist yet.
    async fn load_devices(self: &Arc<Self>, config: &Config) -> Result<(), SdkError> {
        let metadata = self.metadata_client()?;
        for device in metadata.get_devices(&self.name).await? {
            self.ensure_profile(&device.profile_name).await?;
            self.registry.upsert(device).await?;
        }
        for entry in &config.device_list {
            if self.registry.get_by_name(&entry.name).await.is_some() {
                continue;
            }
            let addressable = Addressable {
                id: String::new(),
                name: entry.addressable.name.clone(),
                origin: now_ms(),
                protocol: entry.addressable.protocol.clone(),
                method: entry.addressable.method.clone(),
                address: entry.addressable.address.clone(),
                port: entry.addressable.port,
                path: entry.addressable.path.clone(),
            };
            self.add_device(
                &entry.name,
                &entry.description,
                &entry.labels,
                &entry.profile,
                addressable,
            )
            .await?;
        }
        Ok(())
    }

    /// Create configured schedules and schedule events in metadata;
    /// existing entries are skipped.
    async fn create_schedules(&self, config: &Config) -> Result<(), SdkError> {
        let metadata = self.metadata_client()?;
        for (name, frequency) in &config.schedules {
            parse_iso8601_duration(frequency)?;
            match metadata.create_schedule(name, frequency).await {
                Ok(_) => info!(schedule = %name, "created schedule"),
                Err(SdkError::HttpConflict(_)) => {
                    info!(schedule = %name, "skipping already existing schedule")
                }
                Err(err) => return Err(err),
            }
        }
        for (name, event) in &config.schedule_events {
            if event.path != API_DISCOVERY && !event.path.starts_with(API_DEVICE_PREFIX) {
                error!(event = %name, path = %event.path, "schedule event path not allowed");
                return Err(SdkError::BadConfig(format!(
                    "schedule event {name}: only discovery and device commands are allowed"
                )));
            }
            let addr_name = format!("{name}_addr");
            let addressable = Addressable::new(&addr_name)
                .with_method("GET")
                .with_location(config.service.host.clone(), config.service.port)
                .with_path(event.path.clone());
            match metadata.create_addressable(&addressable).await {
                Ok(_) => info!(addressable = %addr_name, "created addressable"),
                Err(SdkError::HttpConflict(_)) => {
                    info!(addressable = %addr_name, "skipping already existing addressable")
                }
                Err(err) => return Err(err),
            }
            let record = ScheduleEvent {
                id: String::new(),
                name: name.clone(),
                schedule: event.schedule.clone(),
                path: event.path.clone(),
                service: self.name.clone(),
            };
            match metadata.create_schedule_event(&record).await {
                Ok(_) => info!(event = %name, "created schedule event"),
                Err(SdkError::HttpConflict(_)) => {
                    info!(event = %name, "skipping already existing schedule event")
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Fetch this service's schedule events from metadata and turn each
    /// into a scheduler task. Device-command events invoke the dispatcher
    /// directly with the synthesized path, never loopback HTTP.
    async fn register_schedule_tasks(self: &Arc<Self>) -> Result<(), SdkError> {
        let metadata = self.metadata_client()?;
        for event in metadata.get_schedule_events(&self.name).await? {
            let schedule = metadata
                .get_schedule(&event.schedule)
                .await?
                .ok_or_else(|| {
                    SdkError::BadConfig(format!(
                        "schedule event {} references unknown schedule {}",
                        event.name, event.schedule
                    ))
                })?;
            let interval = parse_iso8601_duration(&schedule.frequency)?;
            let action = self.schedule_action(&event)?;
            info!(event = %event.name, ?interval, "scheduling task");
            self.scheduler
                .add(ScheduledTask::new(event.name, interval, action));
        }
        Ok(())
    }

    fn schedule_action(self: &Arc<Self>, event: &ScheduleEvent) -> Result<TaskAction, SdkError> {
        let weak = Arc::downgrade(self);
        if event.path == API_DISCOVERY {
            return Ok(Arc::new(move || {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(svc) = weak.upgrade() {
                        discovery::trigger(&svc);
                    }
                })
            }));
        }
        if let Some(suffix) = event.path.strip_prefix(API_DEVICE_PREFIX) {
            command::parse_device_path(suffix).map_err(|_| {
                SdkError::BadConfig(format!(
                    "schedule event {} has invalid device path {}",
                    event.name, event.path
                ))
            })?;
            let suffix = suffix.to_string();
            return Ok(Arc::new(move || {
                let weak = weak.clone();
                let suffix = suffix.clone();
                Box::pin(async move {
                    if let Some(svc) = weak.upgrade() {
                        if let Err(err) =
                            command::execute_path(&svc, &suffix, CommandMethod::Get, None).await
                        {
                            error!(
                                path = %suffix,
                                status = err.http_status(),
                                %err,
                                "scheduled device request failed"
                            );
                        }
                    }
                })
            }));
        }
        Err(SdkError::BadConfig(format!(
            "schedule event {}: only discovery and device commands are allowed",
            event.name
        )))
    }

    // ========== Device management ==========

    /// Make sure a profile is loaded locally, fetching it from metadata on
    /// first reference.
    pub async fn ensure_profile(&self, name: &str) -> Result<(), SdkError> {
        if self.registry.has_profile(name).await {
            return Ok(());
        }
        let profile = self
            .metadata_client()?
            .get_profile(name)
            .await?
            .ok_or_else(|| SdkError::ProfileNotFound(name.to_string()))?;
        self.registry.add_profile(profile).await;
        Ok(())
    }

    /// Create a device in metadata and the local registry. Called for
    /// configured devices and from discovery. A duplicate name returns the
    /// id of the existing device instead of failing.
    pub async fn add_device(
        &self,
        name: &str,
        description: &str,
        labels: &[String],
        profile_name: &str,
        mut addressable: Addressable,
    ) -> Result<String, SdkError> {
        self.ensure_profile(profile_name).await?;
        if let Some(existing) = self.registry.get_by_name(name).await {
            debug!(device = %name, "device already known");
            return Ok(existing.id);
        }
        let metadata = self.metadata_client()?;
        if addressable.name.is_empty() {
            addressable.name = format!("{name}-addr");
        }
        if addressable.origin == 0 {
            addressable.origin = now_ms();
        }
        match metadata.create_addressable(&addressable).await {
            Ok(id) => addressable.id = id,
            Err(SdkError::HttpConflict(_)) => {
                if let Some(existing) = metadata.get_addressable(&addressable.name).await? {
                    addressable = existing;
                }
            }
            Err(err) => return Err(err),
        }
        let mut device = Device {
            id: String::new(),
            name: name.to_string(),
            description: description.to_string(),
            labels: labels.to_vec(),
            admin_state: AdminState::Unlocked,
            op_state: OperatingState::Enabled,
            origin: now_ms(),
            addressable,
            profile_name: profile_name.to_string(),
            service: self.name.clone(),
        };
        match metadata.create_device(&device).await {
            Ok(id) => {
                device.id = id.clone();
                self.registry.add(device).await?;
                info!(device = %name, %id, "created device");
                Ok(id)
            }
            Err(SdkError::HttpConflict(_)) => {
                let existing = metadata
                    .get_device_by_name(name)
                    .await?
                    .ok_or_else(|| SdkError::DuplicateDevice(name.to_string()))?;
                info!(device = %name, id = %existing.id, "device already in metadata");
                let id = existing.id.clone();
                self.registry.upsert(existing).await?;
                Ok(id)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete a device from metadata and the registry.
    pub async fn remove_device(&self, id: &str) -> Result<(), SdkError> {
        self.metadata_client()?.delete_device(id).await?;
        let removed = self.registry.remove(id).await?;
        info!(device = %removed.name, "removed device");
        Ok(())
    }

    pub async fn remove_device_by_name(&self, name: &str) -> Result<(), SdkError> {
        let device = self
            .registry
            .get_by_name(name)
            .await
            .ok_or_else(|| SdkError::HttpNotFound(format!("device {name}")))?;
        self.remove_device(&device.id).await
    }

    /// Update a device locally and push the new record to metadata.
    pub async fn update_device(&self, key: &str, update: DeviceUpdate) -> Result<Device, SdkError> {
        let updated = self.registry.update(key, update).await?;
        self.metadata_client()?.update_device(&updated).await?;
        Ok(updated)
    }

    /// Snapshot of the loaded profiles.
    pub async fn profiles(&self) -> Vec<DeviceProfile> {
        self.registry.snapshot_profiles().await
    }

    /// Publish readings produced outside a GET command (unsolicited device
    /// data). Takes ownership of the result values; transforms and
    /// assertions apply exactly as on the command path.
    pub fn post_readings(
        &self,
        device_name: &str,
        requests: &[CommandRequest],
        results: Vec<CommandResult>,
    ) {
        let data = match self.data_client() {
            Ok(data) => data,
            Err(err) => {
                error!(%err, "cannot post readings");
                return;
            }
        };
        match events::build_readings(requests, &results, self.data_transform()) {
            Ok(readings) => events::publish(&self.pool, data, device_name, readings),
            Err(err) => error!(device = %device_name, %err, "discarding readings"),
        }
    }
}

/// Install the tracing subscriber per the `[Logging]` section. Harmless if
/// a subscriber is already installed (tests, embedding applications).
fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if !settings.file.is_empty() {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.file)
        {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .try_init();
                return;
            }
            Err(err) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .try_init();
                warn!(file = %settings.file, %err, "cannot open log file, logging to stdout");
                return;
            }
        }
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    if !settings.remote_url.is_empty() {
        warn!(url = %settings.remote_url, "remote log forwarding is not supported, logging locally");
    }
}
