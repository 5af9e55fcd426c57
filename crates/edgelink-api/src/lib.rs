//! Northbound HTTP surface for edgelink device adapters.
//!
//! Exposes the platform-facing API over the runtime: device commands,
//! discovery trigger, metadata callbacks, liveness, configuration and
//! process metrics. Adapters normally hand [`AxumRestServer`] to
//! `DeviceService::new` and never touch this crate again.

pub mod handlers;
pub mod server;

pub use server::router::create_router;
pub use server::state::ServerState;
pub use server::AxumRestServer;
