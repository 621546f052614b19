//! Polled, debounced button driver with click and long-press-reset
//! detection.
//!
//! ## Hardware
//!
//! One momentary switch per controlled outlet. The electrical "pressed"
//! level is per-device configuration (`button_active_level`), so both
//! pull-up and pull-down wirings are supported. The main loop samples the
//! pin each iteration and feeds the level into `tick()`, which runs the
//! debounce + gesture state machine.
//!
//! ## Gesture detection
//!
//! | Gesture       | Condition                | Event          |
//! |---------------|--------------------------|----------------|
//! | Click         | Release after < 5s hold  | `Click`        |
//! | Factory reset | Hold ≥ 5s                | `FactoryReset` |

/// Debounce interval before a press is accepted.
pub const DEBOUNCE_MS: u32 = 50;
/// Hold duration that triggers the factory reset (reboot).
pub const LONG_PRESS_RESET_MS: u32 = 5_000;

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Short press released — toggle the outlet.
    Click,
    /// Held past the reset threshold — reboot the node.
    FactoryReset,
}

/// Internal state machine for gesture detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Released,
    DebounceWait { since_ms: u32 },
    Pressed { since_ms: u32, reset_fired: bool },
}

/// One debounced button bound to a device arena index.
pub struct ButtonDriver {
    device_index: usize,
    pin: u8,
    active_level: u8,
    state: GestureState,
}

impl ButtonDriver {
    pub fn new(device_index: usize, pin: u8, active_level: u8) -> Self {
        Self {
            device_index,
            pin,
            active_level: active_level & 1,
            state: GestureState::Released,
        }
    }

    /// Device arena index this button toggles.
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// GPIO pin this button is attached to.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Call from the main loop each iteration with the current monotonic
    /// time and the sampled electrical level of the button pin.
    /// Returns a classified gesture event, if any.
    pub fn tick(&mut self, now_ms: u32, level: u8) -> Option<ButtonEvent> {
        let pressed = (level & 1) == self.active_level;

        match self.state {
            GestureState::Released => {
                if pressed {
                    self.state = GestureState::DebounceWait { since_ms: now_ms };
                }
                None
            }

            GestureState::DebounceWait { since_ms } => {
                if !pressed {
                    // Contact bounce or noise — back to idle.
                    self.state = GestureState::Released;
                } else if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = GestureState::Pressed {
                        since_ms,
                        reset_fired: false,
                    };
                }
                None
            }

            GestureState::Pressed {
                since_ms,
                reset_fired,
            } => {
                let held_ms = now_ms.wrapping_sub(since_ms);

                if pressed {
                    if held_ms >= LONG_PRESS_RESET_MS && !reset_fired {
                        self.state = GestureState::Pressed {
                            since_ms,
                            reset_fired: true,
                        };
                        return Some(ButtonEvent::FactoryReset);
                    }
                    return None;
                }

                // Release: a short hold is a click; a long hold already
                // triggered the reset (or the reboot is in flight).
                self.state = GestureState::Released;
                if held_ms < LONG_PRESS_RESET_MS {
                    Some(ButtonEvent::Click)
                } else {
                    None
                }
            }
        }
    }
}
