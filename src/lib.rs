//! MQTT-driven OTA firmware updater.
//!
//! Exposes the pure-logic modules for integration testing and fuzzing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, with simulation fallbacks on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod transport;

/// Version announced in the ready banner.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
