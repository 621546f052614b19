//! Port traits — the hexagonal boundary between domain logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayService (domain)
//! ```
//!
//! Driven adapters (GPIO, local mirror, cloud client, event sinks)
//! implement these traits. The [`RelayService`](super::service::RelayService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and the whole write path runs under host tests with mocks.

use crate::device::DeviceRecord;
use crate::error::{CloudError, StoreError};

// ───────────────────────────────────────────────────────────────
// Pin port (driven adapter: domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Raw digital I/O. Levels are electrical (0/1) — polarity correction is
/// the domain's job (see the write path in `service.rs`). Implementations
/// handle and log hardware faults internally; the single-threaded
/// dispatcher guarantees writes are not interleaved.
pub trait PinPort {
    /// Configure a pin as an output (read-back capable).
    fn configure_output(&mut self, pin: u8);

    /// Drive an output pin to the given electrical level.
    fn write_level(&mut self, pin: u8, level: u8);

    /// Read the electrical level of a pin (output read-back or input).
    fn read_level(&self, pin: u8) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Store port (driven adapter: domain ↔ local mirror)
// ───────────────────────────────────────────────────────────────

/// Persistent mirror keyed by device id. Survives reboot and is the
/// authority when the network is down.
pub trait StorePort {
    /// Read the persisted mirror. A missing or unparseable mirror yields
    /// an empty set — hydration never fails fatally.
    fn hydrate(&mut self) -> Vec<DeviceRecord>;

    /// Write `record` under its id, replacing any prior entry. Must be
    /// atomic with respect to concurrent hydrations: a reader sees the
    /// pre- or post-image, never a partial document.
    fn upsert(&mut self, record: &DeviceRecord) -> Result<(), StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Cloud port (driven adapter: domain → remote store)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the remote sync. Publishing is best-effort: the
/// adapter queues the write and retries with a bounded budget; failure
/// never blocks local actuation.
pub trait CloudPort {
    /// Whether the node currently counts as internet-connected
    /// (WiFi up and wall clock synced).
    fn is_online(&self) -> bool;

    /// Queue a merge write of `record` to the remote device node.
    fn publish(&mut self, record: &DeviceRecord) -> Result<(), CloudError>;
}

// ───────────────────────────────────────────────────────────────
// Time port (driven adapter: domain ← wall clock)
// ───────────────────────────────────────────────────────────────

/// Wall-clock source. Alarms fire in wall-clock time, so the epoch is
/// only available once NTP has synced.
pub trait TimePort {
    /// Seconds since the Unix epoch, or `None` before the first
    /// successful sync.
    fn now_epoch_secs(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Alarm delegate (decouples the registry from the write path)
// ───────────────────────────────────────────────────────────────

/// Which of a device's two daily alarms fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// `start_time` slot (`relay_pin`).
    On,
    /// `end_time` slot (`relay_pin + 1`).
    Off,
}

/// Callback trait the alarm registry invokes when a slot fires.
///
/// This keeps the [`AlarmRegistry`](crate::alarms::AlarmRegistry)
/// independent of the service: the registry knows nothing about pins,
/// stores, or the cloud — it reports `(device_index, slot, kind)` and the
/// caller routes that into the common write path.
pub trait AlarmDelegate {
    fn on_alarm_fired(&mut self, device_index: usize, slot: u8, kind: AlarmKind);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, a test
/// recorder, a future telemetry channel).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
