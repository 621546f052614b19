//! Device records — the central entity.
//!
//! One record describes one controlled outlet: its pin map, commanded and
//! read-back state, boot policy, and daily alarm times. The same schema is
//! used for the persisted local mirror (`data.json`) and the remote
//! payloads, so encode/decode is symmetric across both.

use serde::{Deserialize, Serialize};

/// Boot policy value meaning "restore the last persisted desired state".
pub const DEFAULT_RESTORE: i8 = -1;

/// In-memory and persisted description of one controlled outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Stable identity across reboots and cloud updates.
    #[serde(default)]
    pub id: String,
    /// Output pin controlling the relay.
    pub relay_pin: u8,
    /// Output pin mirroring the visible state.
    pub led_pin: u8,
    /// Input pin of the physical toggle.
    pub button_pin: u8,
    /// Electrical level that denotes "pressed".
    #[serde(default)]
    pub button_active_level: bool,
    /// Logical state the relay should be in (0 or 1).
    #[serde(default)]
    pub desired_state: u8,
    /// Last logical state read back from the pin after a write.
    #[serde(default)]
    pub observed_state: u8,
    /// Boot-time override: 0 or 1 forces that state, −1 restores the
    /// persisted `desired_state`. Not altered by cloud updates unless the
    /// cloud explicitly sends a new value.
    #[serde(default = "restore_policy")]
    pub default_state: i8,
    /// Daily on-alarm in seconds-of-day; 0 means "none".
    #[serde(default)]
    pub start_time: u32,
    /// Daily off-alarm in seconds-of-day; 0 means "none".
    #[serde(default)]
    pub end_time: u32,
}

fn restore_policy() -> i8 {
    DEFAULT_RESTORE
}

/// Seconds in one day; alarm times are always below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

impl DeviceRecord {
    /// Alarm slot for the daily on-alarm.
    pub fn on_slot(&self) -> u8 {
        self.relay_pin
    }

    /// Alarm slot for the daily off-alarm. Collisions are impossible while
    /// pins stay globally unique.
    pub fn off_slot(&self) -> u8 {
        self.relay_pin.wrapping_add(1)
    }

    /// Clamp wire values into their domains. Remote payloads are untrusted:
    /// states fold to {0,1}, the boot policy folds to {−1,0,1}, and alarm
    /// times wrap into seconds-of-day.
    pub fn normalized(mut self) -> Self {
        self.desired_state &= 1;
        self.observed_state &= 1;
        if !(-1..=1).contains(&self.default_state) {
            self.default_state = DEFAULT_RESTORE;
        }
        self.start_time %= SECONDS_PER_DAY;
        self.end_time %= SECONDS_PER_DAY;
        self
    }

    /// The three pins of one device must be pairwise distinct.
    pub fn pins_distinct(&self) -> bool {
        self.relay_pin != self.led_pin
            && self.relay_pin != self.button_pin
            && self.led_pin != self.button_pin
    }

    /// Pins this record claims, in a fixed order.
    pub fn pins(&self) -> [u8; 3] {
        [self.relay_pin, self.led_pin, self.button_pin]
    }
}
