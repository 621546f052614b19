//! Board polarity constants.
//!
//! Single source of truth — the write path references these masks rather
//! than hard-coding relay polarity. Change the board variant here and it
//! propagates everywhere.
//!
//! Pin *numbers* are not fixed at compile time: each device record carries
//! its own relay/LED/button pin assignment (see [`crate::device`]).

/// XOR mask applied when driving a relay pin. The stock board uses
/// active-low relay modules, so logical 1 ("load on") drives the pin low.
pub const RELAY_WRITE_MASK: u8 = 1;

/// XOR mask applied when reading a relay pin back, inverse of the write
/// mask so that `read_pin` yields the logical state.
pub const RELAY_READ_MASK: u8 = 1;

/// The status LED mirrors the logical value directly (no inversion).
pub const LED_WRITE_MASK: u8 = 0;
