//! Runtime for building device-adapter services.
//!
//! An adapter embeds this crate, supplies a [`driver::ProtocolDriver`] and
//! runs a [`service::DeviceService`]: the runtime registers the adapter
//! with the platform, uploads its profiles and devices, dispatches
//! northbound commands to the driver, publishes readings as events and
//! drives periodic self-invocations.
//!
//! Subsystem map:
//! - [`registry`]: concurrent device/profile store
//! - [`transform`]: numeric value transformations
//! - [`command`]: request routing and the driver call pipeline
//! - [`events`]: event construction and async posting
//! - [`pool`] / [`scheduler`]: worker pool and periodic tasks
//! - [`service`]: lifecycle orchestration
//! - [`callback`] / [`discovery`]: platform callbacks and discovery
//! - [`clients`]: platform service clients

pub mod callback;
pub mod clients;
pub mod command;
pub mod discovery;
pub mod driver;
pub mod events;
pub mod pool;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod transform;

pub use command::{parse_device_path, CommandMethod, DeviceSelector};
pub use driver::{CommandRequest, CommandResult, DiscoveryContext, MockDriver, ProtocolDriver};
pub use pool::WorkerPool;
pub use registry::{DeviceRegistry, DeviceUpdate};
pub use scheduler::{ScheduledTask, Scheduler};
pub use service::{DeviceService, NoopRestServer, RestServer, ServiceState};
