//! GPIO adapter — bridges raw digital pins to [`PinPort`].
//!
//! This is the only module in the system that touches actual pin
//! registers. Relay and LED pins are configured as read-back capable
//! outputs so the write path can verify its own writes.
//!
//! - **`target_os = "espidf"`** — raw `gpio_*` calls from `esp_idf_sys`.
//!   Pins are runtime values from device records, so the typed
//!   peripherals API does not fit; `GPIO_MODE_INPUT_OUTPUT` keeps the
//!   input buffer enabled for read-back.
//! - **all other targets** — an in-memory level map for host tests.

use crate::app::ports::PinPort;

#[cfg(not(target_os = "espidf"))]
use std::collections::BTreeMap;

/// Concrete adapter over the board's digital pins.
pub struct GpioAdapter {
    #[cfg(not(target_os = "espidf"))]
    levels: BTreeMap<u8, u8>,
}

impl GpioAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            levels: BTreeMap::new(),
        }
    }

    /// Configure a pin as a floating input (buttons use external or
    /// internal pull resistors per board wiring).
    #[cfg(target_os = "espidf")]
    pub fn configure_input(&mut self, pin: u8) {
        use esp_idf_svc::sys::{
            gpio_mode_t_GPIO_MODE_INPUT, gpio_pull_mode_t_GPIO_PULLUP_ONLY, gpio_set_direction,
            gpio_set_pull_mode,
        };
        unsafe {
            gpio_set_direction(i32::from(pin), gpio_mode_t_GPIO_MODE_INPUT);
            gpio_set_pull_mode(i32::from(pin), gpio_pull_mode_t_GPIO_PULLUP_ONLY);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn configure_input(&mut self, pin: u8) {
        // Idle level for a pulled-up button is high.
        self.levels.entry(pin).or_insert(1);
    }

    /// Host-test hook: force the sampled level of a pin (button presses).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_level(&mut self, pin: u8, level: u8) {
        self.levels.insert(pin, level & 1);
    }
}

impl Default for GpioAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── PinPort implementation ────────────────────────────────────

#[cfg(target_os = "espidf")]
impl PinPort for GpioAdapter {
    fn configure_output(&mut self, pin: u8) {
        use esp_idf_svc::sys::{gpio_mode_t_GPIO_MODE_INPUT_OUTPUT, gpio_set_direction};
        unsafe {
            gpio_set_direction(i32::from(pin), gpio_mode_t_GPIO_MODE_INPUT_OUTPUT);
        }
    }

    fn write_level(&mut self, pin: u8, level: u8) {
        use esp_idf_svc::sys::gpio_set_level;
        unsafe {
            gpio_set_level(i32::from(pin) as u32, u32::from(level & 1));
        }
    }

    fn read_level(&self, pin: u8) -> u8 {
        use esp_idf_svc::sys::gpio_get_level;
        (unsafe { gpio_get_level(i32::from(pin)) } & 1) as u8
    }
}

#[cfg(not(target_os = "espidf"))]
impl PinPort for GpioAdapter {
    fn configure_output(&mut self, pin: u8) {
        self.levels.entry(pin).or_insert(0);
    }

    fn write_level(&mut self, pin: u8, level: u8) {
        self.levels.insert(pin, level & 1);
    }

    fn read_level(&self, pin: u8) -> u8 {
        self.levels.get(&pin).copied().unwrap_or(0)
    }
}

// ── Reboot ────────────────────────────────────────────────────

/// Restart the node. The local mirror is left intact; state is restored
/// through the normal boot path.
#[cfg(target_os = "espidf")]
pub fn reboot() -> ! {
    unsafe { esp_idf_svc::sys::esp_restart() }
}

#[cfg(not(target_os = "espidf"))]
pub fn reboot() {
    log::info!("GPIO(sim): reboot requested");
}
