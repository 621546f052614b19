//! Adapters — concrete implementations of the port traits.
//!
//! Each adapter bridges one outside-world concern (GPIO, the local JSON
//! mirror, the cloud client, WiFi, SNTP, logging) to the hexagonal
//! boundary in [`crate::app::ports`]. Hardware-touching adapters are
//! cfg-gated: real ESP-IDF calls on `target_os = "espidf"`, simulation
//! backends everywhere else so the full stack runs under host tests.

pub mod cloud;
pub mod fs_store;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod wifi;
