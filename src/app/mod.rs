//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for the relay controller:
//! the device arena, the common write path, snapshot/delta reconciliation
//! and the alarm bindings. All interaction with hardware, the filesystem
//! and the cloud happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
