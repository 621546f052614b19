//! Inbound commands to the application service.
//!
//! The three concurrent stimuli — remote updates, button presses, alarm
//! firings — are funnelled through this one type, so every state mutation
//! enters the [`RelayService`](super::service::RelayService) through the
//! same dispatch and, from there, the common write path.

use crate::sync::InboundPayload;

/// Commands that input sources can send into the application core.
#[derive(Debug, Clone)]
pub enum Command {
    /// A classified payload from the remote stream (snapshot or delta).
    Remote(InboundPayload),

    /// A debounced click on the button of the device at `device_index`.
    ButtonClick { device_index: usize },

    /// The alarm in `slot` fired for the device at `device_index`.
    AlarmFired { device_index: usize, slot: u8 },
}
