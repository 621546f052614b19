//! Time-of-day alarm registry.
//!
//! Per device, two daily repeating alarms keyed by pin-derived slot ids:
//! the on-alarm lives in slot `relay_pin`, the off-alarm in slot
//! `relay_pin + 1`. Slot collisions are impossible while pins stay
//! globally unique.
//!
//! The registry is intentionally decoupled from the write path. When a
//! slot fires it invokes the [`AlarmDelegate`] callback rather than
//! touching pins or stores itself, which makes it independently testable.

use log::{info, warn};

use crate::app::ports::{AlarmDelegate, AlarmKind};
use crate::device::{DeviceRecord, SECONDS_PER_DAY};

/// Maximum number of live alarm slots (two per device).
pub const MAX_ALARM_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct AlarmEntry {
    slot: u8,
    device_index: usize,
    kind: AlarmKind,
    /// Seconds-of-day trigger; always nonzero for a live entry.
    fire_at: u32,
}

/// Fixed-capacity slot table of daily repeating alarms.
pub struct AlarmRegistry {
    entries: heapless::Vec<AlarmEntry, MAX_ALARM_SLOTS>,
    /// Seconds-of-day at the previous tick; `None` until the first pump.
    prev_sod: Option<u32>,
}

/// Seconds-of-day for an epoch timestamp (UTC).
pub fn seconds_of_day(epoch_secs: u64) -> u32 {
    (epoch_secs % u64::from(SECONDS_PER_DAY)) as u32
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
            prev_sod: None,
        }
    }

    /// Whether `slot` currently holds an alarm.
    pub fn is_allocated(&self, slot: u8) -> bool {
        self.entries.iter().any(|e| e.slot == slot)
    }

    /// Device arena index owning `slot`, if any.
    pub fn slot_owner(&self, slot: u8) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.slot == slot)
            .map(|e| e.device_index)
    }

    /// Number of live slots.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Bring both of a device's slots in line with its record:
    /// allocated + nonzero time → rewrite in place; allocated + zero →
    /// free; unallocated + nonzero → allocate; unallocated + zero → no-op.
    pub fn reconcile(&mut self, device_index: usize, record: &DeviceRecord) {
        self.reconcile_slot(record.on_slot(), device_index, AlarmKind::On, record.start_time);
        self.reconcile_slot(record.off_slot(), device_index, AlarmKind::Off, record.end_time);
    }

    fn reconcile_slot(&mut self, slot: u8, device_index: usize, kind: AlarmKind, fire_at: u32) {
        // A live slot belongs to exactly one device; updates from any
        // other device are dropped, never reassigned.
        if let Some(owner) = self.slot_owner(slot) {
            if owner != device_index {
                warn!(
                    "alarm: slot {} owned by device {}, update from device {} ignored",
                    slot, owner, device_index
                );
                return;
            }
        }

        match (self.entries.iter_mut().find(|e| e.slot == slot), fire_at) {
            (Some(entry), t) if t != 0 => {
                if entry.fire_at != t {
                    info!("alarm: slot {} rewritten to {}s", slot, t);
                    entry.fire_at = t;
                }
            }
            (Some(_), _) => {
                info!("alarm: slot {} freed", slot);
                self.entries.retain(|e| e.slot != slot);
            }
            (None, 0) => {}
            (None, t) => {
                let entry = AlarmEntry {
                    slot,
                    device_index,
                    kind,
                    fire_at: t,
                };
                if self.entries.push(entry).is_err() {
                    warn!("alarm: table full, slot {} not allocated", slot);
                } else {
                    info!("alarm: slot {} allocated at {}s ({:?})", slot, t, kind);
                }
            }
        }
    }

    /// Pump the registry. Fires every slot whose trigger time fell inside
    /// the window since the previous pump (exclusive/inclusive), handling
    /// the midnight wrap. The first pump only anchors the window so stale
    /// triggers from before boot never fire retroactively.
    pub fn tick(&mut self, now_epoch_secs: u64, delegate: &mut dyn AlarmDelegate) {
        let now = seconds_of_day(now_epoch_secs);
        if let Some(prev) = self.prev_sod {
            for entry in &self.entries {
                if in_window(prev, now, entry.fire_at) {
                    info!("alarm: slot {} fired ({:?})", entry.slot, entry.kind);
                    delegate.on_alarm_fired(entry.device_index, entry.slot, entry.kind);
                }
            }
        }
        self.prev_sod = Some(now);
    }
}

impl Default for AlarmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `t` lies in the half-open window `(prev, now]` on the daily
/// clock face.
fn in_window(prev: u32, now: u32, t: u32) -> bool {
    if prev < now {
        t > prev && t <= now
    } else if prev > now {
        // Wrapped past midnight.
        t > prev || t <= now
    } else {
        false
    }
}
