//! Outbound application events.
//!
//! The [`RelayService`](super::service::RelayService) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them — log to serial, record in a test,
//! feed a future telemetry channel.

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Boot materialization finished (carries the arena size).
    Started { devices: usize },

    /// The common write path completed for one device.
    StateWritten { id: String, desired: u8, observed: u8 },

    /// A single-device remote delta was applied.
    DeltaApplied { id: String },

    /// A full remote snapshot was reconciled. `repaired` counts entries
    /// that needed a pin rewrite (drift repair or boot override).
    SnapshotReconciled { devices: usize, repaired: usize },

    /// A publish was rejected by the cloud adapter (queue full or the
    /// retry budget exhausted). Local state is unaffected.
    PublishFailed { id: String },

    /// A long-press crossed the reset threshold; a reboot follows.
    FactoryResetRequested,
}
