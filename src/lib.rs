//! Relayhub firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alarms;
pub mod app;
pub mod config;
pub mod device;
pub mod error;
pub mod pins;
pub mod sync;

// Adapters and drivers carry cfg-gated ESP-IDF implementations alongside
// host-side simulation backends.
pub mod adapters;
pub mod drivers;
