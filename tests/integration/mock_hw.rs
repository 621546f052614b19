//! Mock adapters for integration tests.
//!
//! Each mock records its full call history so tests can assert on exact
//! pin writes, store upserts and publishes without real GPIO, flash, or
//! network.

use std::collections::BTreeMap;

use relayhub::app::events::AppEvent;
use relayhub::app::ports::{CloudPort, EventSink, PinPort, StorePort};
use relayhub::device::DeviceRecord;
use relayhub::error::{CloudError, StoreError};

// ── MockPins ──────────────────────────────────────────────────

/// [`PinPort`] over an in-memory level map, recording every write.
pub struct MockPins {
    levels: BTreeMap<u8, u8>,
    pub writes: Vec<(u8, u8)>,
    pub configured: Vec<u8>,
}

#[allow(dead_code)]
impl MockPins {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
            writes: Vec::new(),
            configured: Vec::new(),
        }
    }

    /// Electrical level currently latched on `pin`.
    pub fn level(&self, pin: u8) -> u8 {
        self.levels.get(&pin).copied().unwrap_or(0)
    }

    /// Logical relay state as the write path reads it back.
    pub fn logical(&self, pin: u8) -> u8 {
        self.level(pin) ^ relayhub::pins::RELAY_READ_MASK
    }

    /// Force an electrical level without recording a write (external
    /// drift, e.g. a glitch while powered off).
    pub fn force_level(&mut self, pin: u8, level: u8) {
        self.levels.insert(pin, level & 1);
    }
}

impl PinPort for MockPins {
    fn configure_output(&mut self, pin: u8) {
        self.configured.push(pin);
        self.levels.entry(pin).or_insert(0);
    }

    fn write_level(&mut self, pin: u8, level: u8) {
        self.writes.push((pin, level & 1));
        self.levels.insert(pin, level & 1);
    }

    fn read_level(&self, pin: u8) -> u8 {
        self.level(pin)
    }
}

// ── MockStore ─────────────────────────────────────────────────

/// [`StorePort`] over a plain map, counting upserts.
pub struct MockStore {
    pub map: BTreeMap<String, DeviceRecord>,
    pub upserts: usize,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            upserts: 0,
            fail_writes: false,
        }
    }

    pub fn with_records(records: Vec<DeviceRecord>) -> Self {
        let mut store = Self::new();
        for rec in records {
            store.map.insert(rec.id.clone(), rec);
        }
        store
    }
}

impl StorePort for MockStore {
    fn hydrate(&mut self) -> Vec<DeviceRecord> {
        self.map.values().cloned().collect()
    }

    fn upsert(&mut self, record: &DeviceRecord) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteFailed);
        }
        self.upserts += 1;
        self.map.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

// ── MockCloud ─────────────────────────────────────────────────

/// [`CloudPort`] recording publishes in arrival order.
pub struct MockCloud {
    pub online: bool,
    pub published: Vec<DeviceRecord>,
    pub fail_publishes: u32,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn new() -> Self {
        Self {
            online: false,
            published: Vec::new(),
            fail_publishes: 0,
        }
    }

    pub fn online() -> Self {
        Self {
            online: true,
            ..Self::new()
        }
    }
}

impl CloudPort for MockCloud {
    fn is_online(&self) -> bool {
        self.online
    }

    fn publish(&mut self, record: &DeviceRecord) -> Result<(), CloudError> {
        if self.fail_publishes > 0 {
            self.fail_publishes -= 1;
            return Err(CloudError::QueueFull);
        }
        self.published.push(record.clone());
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

/// [`EventSink`] keeping every emitted event for assertions.
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count_state_written(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::StateWritten { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Record builders ───────────────────────────────────────────

/// A minimal valid record: relay 5, led 4, button 0 (the wiring used
/// throughout the end-to-end scenarios).
#[allow(dead_code)]
pub fn record_a() -> DeviceRecord {
    DeviceRecord {
        id: "A".into(),
        relay_pin: 5,
        led_pin: 4,
        button_pin: 0,
        button_active_level: false,
        desired_state: 1,
        observed_state: 1,
        default_state: -1,
        start_time: 0,
        end_time: 0,
    }
}

/// A second device on a disjoint pin set.
#[allow(dead_code)]
pub fn record_b() -> DeviceRecord {
    DeviceRecord {
        id: "B".into(),
        relay_pin: 12,
        led_pin: 13,
        button_pin: 14,
        button_active_level: false,
        desired_state: 0,
        observed_state: 0,
        default_state: -1,
        start_time: 0,
        end_time: 0,
    }
}
