//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future telemetry adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { devices } => {
                info!("START | devices={}", devices);
            }
            AppEvent::StateWritten {
                id,
                desired,
                observed,
            } => {
                info!("STATE | {} -> {} (readback {})", id, desired, observed);
            }
            AppEvent::DeltaApplied { id } => {
                info!("SYNC  | delta applied for {}", id);
            }
            AppEvent::SnapshotReconciled { devices, repaired } => {
                info!("SYNC  | snapshot reconciled, {}/{} repaired", repaired, devices);
            }
            AppEvent::PublishFailed { id } => {
                warn!("CLOUD | publish dropped for {}", id);
            }
            AppEvent::FactoryResetRequested => {
                warn!("RESET | long press threshold crossed, rebooting");
            }
        }
    }
}
