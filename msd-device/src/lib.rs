//! Device context for a managed switch
//!
//! [`DeviceContext`] replaces global device state: it owns the register
//! bus, the SMI / AVB / FRER windows (one lock each) and an optional RMU
//! session, and is handed by reference to whatever needs the device.

pub mod config;
pub mod context;

pub use config::{DeviceConfig, RegisterAccess};
pub use context::{DeviceContext, RmuLink};
