//! Application service — the hexagonal core.
//!
//! [`RelayService`] owns the device arena and the alarm registry and is
//! the single chokepoint for every state mutation: remote deltas, remote
//! snapshots, button clicks and alarm firings all funnel into
//! [`apply_state`](RelayService::apply_state), which drives the pin,
//! refreshes the in-memory record, queues the remote publish and persists
//! the local mirror.
//!
//! ```text
//!     PinPort ◀── ┌────────────────────────┐ ──▶ EventSink
//!                 │      RelayService       │
//!   CloudPort ◀── │  arena · write path ·   │ ──▶ StorePort
//!                 │  alarm reconciliation   │
//!                 └────────────────────────┘
//! ```
//!
//! Callbacks (buttons, alarms) never capture a record by value: they
//! carry the device's arena index, and every access goes through the
//! arena — so a record mutated by one source is immediately visible to
//! the others.

use log::{info, warn};

use crate::alarms::{AlarmRegistry, MAX_ALARM_SLOTS};
use crate::device::{DEFAULT_RESTORE, DeviceRecord};
use crate::drivers::button::ButtonDriver;
use crate::pins::{LED_WRITE_MASK, RELAY_READ_MASK, RELAY_WRITE_MASK};
use crate::sync::{DeltaFields, InboundPayload};

use super::commands::Command;
use super::events::AppEvent;
use super::ports::{AlarmDelegate, AlarmKind, CloudPort, EventSink, PinPort, StorePort};

// ───────────────────────────────────────────────────────────────
// Polarity-correcting pin I/O
// ───────────────────────────────────────────────────────────────

/// Drive a relay and its status LED to a logical value. The relay level
/// goes through the board polarity mask; the LED mirrors the logical
/// value directly.
fn write_pin(pins: &mut impl PinPort, relay_pin: u8, led_pin: u8, value: u8) {
    pins.write_level(relay_pin, (value & 1) ^ RELAY_WRITE_MASK);
    pins.write_level(led_pin, (value & 1) ^ LED_WRITE_MASK);
}

/// Read a relay pin back as a logical value.
fn read_pin(pins: &impl PinPort, relay_pin: u8) -> u8 {
    (pins.read_level(relay_pin) & 1) ^ RELAY_READ_MASK
}

// ───────────────────────────────────────────────────────────────
// RelayService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct RelayService {
    /// Device arena. Indices are stable for the lifetime of the process;
    /// records are never destroyed during normal operation.
    devices: Vec<DeviceRecord>,
    alarms: AlarmRegistry,
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            alarms: AlarmRegistry::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Record at `device_index`, if the index is live.
    pub fn device(&self, device_index: usize) -> Option<&DeviceRecord> {
        self.devices.get(device_index)
    }

    /// All live records, in arena order.
    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    /// Arena index of the device with `id`.
    pub fn find(&self, id: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }

    /// Read-only view of the alarm table.
    pub fn alarms(&self) -> &AlarmRegistry {
        &self.alarms
    }

    // ── Boot ──────────────────────────────────────────────────

    /// Materialize hydrated records, configure their pins as outputs and
    /// apply the boot-time `default_state` rule:
    ///
    /// - `−1` restores the persisted desired state — pin write only, no
    ///   store churn and no remote activity;
    /// - `0`/`1` forces that state through the full write path (persist
    ///   and queue a publish) when it differs from the persisted state.
    ///
    /// Alarms are installed from the persisted times so schedules keep
    /// working offline.
    pub fn boot(
        &mut self,
        records: Vec<DeviceRecord>,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        for record in records {
            let record = record.normalized();
            let Some(idx) = self.materialize(record, pins) else {
                continue;
            };

            let rec = &self.devices[idx];
            let (relay, led) = (rec.relay_pin, rec.led_pin);
            let default_state = rec.default_state;
            let desired = rec.desired_state;

            if default_state == DEFAULT_RESTORE {
                write_pin(pins, relay, led, desired);
                self.devices[idx].observed_state = read_pin(pins, relay);
            } else {
                let target = default_state as u8 & 1;
                if target == desired {
                    write_pin(pins, relay, led, target);
                    self.devices[idx].observed_state = read_pin(pins, relay);
                } else {
                    self.apply_state(idx, target, pins, cloud, store, sink);
                }
            }

            let rec = self.devices[idx].clone();
            self.alarms.reconcile(idx, &rec);
        }

        info!("service: booted with {} device(s)", self.devices.len());
        sink.emit(&AppEvent::Started {
            devices: self.devices.len(),
        });
    }

    /// One debounced button per materialized device. Buttons are only
    /// created here: a device added remotely at runtime gets its button
    /// after the next reboot.
    pub fn make_buttons(&self) -> Vec<ButtonDriver> {
        self.devices
            .iter()
            .enumerate()
            .map(|(idx, d)| ButtonDriver::new(idx, d.button_pin, u8::from(d.button_active_level)))
            .collect()
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one input event. Every source funnels through here.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            Command::Remote(InboundPayload::Delta { record, carried }) => {
                self.apply_delta(record, carried, pins, cloud, store, sink);
            }
            Command::Remote(InboundPayload::Snapshot(map)) => {
                let entries: Vec<(String, DeviceRecord)> = map.into_iter().collect();
                self.apply_snapshot(entries, pins, cloud, store, sink);
            }
            Command::ButtonClick { device_index } => {
                self.toggle(device_index, pins, cloud, store, sink);
            }
            Command::AlarmFired { device_index, slot } => {
                info!("service: alarm slot {} fired", slot);
                self.toggle(device_index, pins, cloud, store, sink);
            }
        }
    }

    /// Pump due alarms and route each firing into the write path.
    pub fn pump_alarms(
        &mut self,
        now_epoch_secs: u64,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        let mut fired = FireCollector::default();
        self.alarms.tick(now_epoch_secs, &mut fired);
        for (device_index, slot) in fired.fires {
            self.handle_command(
                Command::AlarmFired { device_index, slot },
                pins,
                cloud,
                store,
                sink,
            );
        }
    }

    // ── Remote application ────────────────────────────────────

    /// Delta: apply unconditionally. Actuate the pin to the incoming
    /// desired state, refresh the record, reinstall alarms, persist and
    /// publish the post-image back.
    fn apply_delta(
        &mut self,
        incoming: DeviceRecord,
        carried: DeltaFields,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        let incoming = incoming.normalized();
        if incoming.id.is_empty() {
            warn!("service: delta without id dropped");
            return;
        }

        let Some(idx) = self.adopt(&incoming, carried, pins) else {
            return;
        };
        self.apply_state(idx, incoming.desired_state, pins, cloud, store, sink);

        let rec = self.devices[idx].clone();
        self.alarms.reconcile(idx, &rec);
        sink.emit(&AppEvent::DeltaApplied { id: rec.id });
    }

    /// Snapshot: per entry, a three-way reconcile against the live pin.
    ///
    /// 1. Restore policy and the persisted read-back disagrees with the
    ///    live pin — state drifted while offline: rewrite to the desired
    ///    state, persist, publish.
    /// 2. Forced boot policy that the persisted read-back does not match:
    ///    drive the pin to the default, persist, publish.
    /// 3. Otherwise remote and local truth already agree: refresh memory
    ///    and the mirror only — zero pin writes, zero publishes.
    fn apply_snapshot(
        &mut self,
        entries: Vec<(String, DeviceRecord)>,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        let total = entries.len();
        let mut repaired = 0usize;

        for (_, incoming) in entries {
            let incoming = incoming.normalized();
            let Some(idx) = self.adopt(&incoming, DeltaFields::all(), pins) else {
                continue;
            };

            let live = read_pin(pins, self.devices[idx].relay_pin);

            if incoming.default_state == DEFAULT_RESTORE && incoming.observed_state != live {
                self.apply_state(idx, incoming.desired_state, pins, cloud, store, sink);
                repaired += 1;
            } else if incoming.default_state != DEFAULT_RESTORE
                && incoming.default_state as u8 != incoming.observed_state
            {
                self.apply_state(idx, incoming.default_state as u8, pins, cloud, store, sink);
                repaired += 1;
            } else {
                let rec = &mut self.devices[idx];
                rec.desired_state = incoming.desired_state;
                rec.observed_state = incoming.observed_state;
                let rec = self.devices[idx].clone();
                if let Err(e) = store.upsert(&rec) {
                    warn!("store: upsert for '{}' failed: {}", rec.id, e);
                }
            }

            let rec = self.devices[idx].clone();
            self.alarms.reconcile(idx, &rec);
        }

        sink.emit(&AppEvent::SnapshotReconciled {
            devices: total,
            repaired,
        });
    }

    // ── Common write path ─────────────────────────────────────

    /// The single chokepoint for every state mutation, from any source:
    ///
    /// 1. drive the relay + LED pins,
    /// 2. record the new desired state,
    /// 3. read the relay back into `observed_state`,
    /// 4. queue the remote publish (best-effort, flushed when online),
    /// 5. persist the local mirror.
    ///
    /// Steps 4 and 5 are idempotent for identical records, so duplicate
    /// deliveries and retries are safe.
    fn apply_state(
        &mut self,
        idx: usize,
        new_desired: u8,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        let (relay, led) = {
            let rec = &self.devices[idx];
            (rec.relay_pin, rec.led_pin)
        };

        write_pin(pins, relay, led, new_desired);
        let observed = read_pin(pins, relay);

        {
            let rec = &mut self.devices[idx];
            rec.desired_state = new_desired;
            rec.observed_state = observed;
        }
        if observed != new_desired {
            // Readback divergence stays visible in observed_state; the
            // next snapshot reconcile retries the write.
            warn!(
                "pin {}: readback {} after commanding {}",
                relay, observed, new_desired
            );
        }

        let rec = self.devices[idx].clone();
        if let Err(e) = cloud.publish(&rec) {
            warn!("cloud: publish for '{}' dropped: {}", rec.id, e);
            sink.emit(&AppEvent::PublishFailed { id: rec.id.clone() });
        }
        if let Err(e) = store.upsert(&rec) {
            warn!(
                "store: upsert for '{}' failed: {} — memory stays authoritative",
                rec.id, e
            );
        }

        sink.emit(&AppEvent::StateWritten {
            id: rec.id,
            desired: new_desired,
            observed,
        });
    }

    /// Toggle a device: the new desired state is the logical inverse of
    /// the current pin reading.
    fn toggle(
        &mut self,
        idx: usize,
        pins: &mut impl PinPort,
        cloud: &mut impl CloudPort,
        store: &mut impl StorePort,
        sink: &mut impl EventSink,
    ) {
        let Some(rec) = self.devices.get(idx) else {
            warn!("service: toggle for dead index {} dropped", idx);
            return;
        };
        let new_desired = read_pin(pins, rec.relay_pin) ^ 1;
        self.apply_state(idx, new_desired, pins, cloud, store, sink);
    }

    // ── Internal ──────────────────────────────────────────────

    /// Find the arena index for `incoming`, materializing a new device if
    /// the id is unknown. Known devices absorb only the policy fields the
    /// payload carried (schedule, boot default, button level) — an
    /// omitted field is not remote intent and the stored policy stands.
    /// A changed pin map is logged and deferred to the next reboot, since
    /// pins are single-owner hardware configuration.
    fn adopt(
        &mut self,
        incoming: &DeviceRecord,
        carried: DeltaFields,
        pins: &mut impl PinPort,
    ) -> Option<usize> {
        if let Some(idx) = self.find(&incoming.id) {
            let rec = &mut self.devices[idx];
            if rec.pins() != incoming.pins() {
                warn!(
                    "device '{}': remote pin remap {:?} -> {:?} deferred to reboot",
                    rec.id,
                    rec.pins(),
                    incoming.pins()
                );
            }
            if carried.button_active_level {
                rec.button_active_level = incoming.button_active_level;
            }
            if carried.default_state {
                rec.default_state = incoming.default_state;
            }
            if carried.start_time {
                rec.start_time = incoming.start_time;
            }
            if carried.end_time {
                rec.end_time = incoming.end_time;
            }
            Some(idx)
        } else {
            self.materialize(incoming.clone(), pins)
        }
    }

    /// Insert a new record into the arena, enforcing pin uniqueness
    /// (pairwise within the device and globally across the arena), and
    /// configure its output pins. Violations drop the record.
    fn materialize(&mut self, record: DeviceRecord, pins: &mut impl PinPort) -> Option<usize> {
        if record.id.is_empty() {
            warn!("service: record without id dropped");
            return None;
        }
        if !record.pins_distinct() {
            warn!(
                "device '{}': pins {:?} not pairwise distinct, dropped",
                record.id,
                record.pins()
            );
            return None;
        }
        if let Some(clash) = self.devices.iter().find(|d| {
            d.pins()
                .iter()
                .any(|p| record.pins().contains(p))
        }) {
            warn!(
                "device '{}': pin map collides with '{}', dropped",
                record.id, clash.id
            );
            return None;
        }
        // Slot pairs are pin-derived; adjacent relay pins would make two
        // devices claim the same alarm slot.
        if let Some(clash) = self.devices.iter().find(|d| {
            let pair = [d.on_slot(), d.off_slot()];
            pair.contains(&record.on_slot()) || pair.contains(&record.off_slot())
        }) {
            warn!(
                "device '{}': alarm slot pair collides with '{}', dropped",
                record.id, clash.id
            );
            return None;
        }

        pins.configure_output(record.relay_pin);
        pins.configure_output(record.led_pin);
        info!("device '{}': materialized (relay pin {})", record.id, record.relay_pin);
        self.devices.push(record);
        Some(self.devices.len() - 1)
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects alarm firings so the registry borrow ends before the write
/// path runs.
#[derive(Default)]
struct FireCollector {
    fires: heapless::Vec<(usize, u8), MAX_ALARM_SLOTS>,
}

impl AlarmDelegate for FireCollector {
    fn on_alarm_fired(&mut self, device_index: usize, slot: u8, _kind: AlarmKind) {
        if self.fires.push((device_index, slot)).is_err() {
            warn!("service: alarm burst overflow, firing dropped");
        }
    }
}
