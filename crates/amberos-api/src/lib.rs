// amberos-api: Blocking device-client boundary for AmberOS NAS devices.
//
// The vendor client that talks to the device is a black box. This crate
// pins down the contract the orchestration layer relies on: one blocking
// `update()` per capability group, a distinguished login-invalid error,
// and typed models for every group.

pub mod capability;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use capability::Capability;
pub use client::{CastCommand, ClientFactory, DeviceClient, RepeatMode};
pub use error::Error;
pub use models::CapabilityData;
pub use transport::ConnectionParams;
