//! Cloud sync adapter — the Firebase-style remote store client.
//!
//! Implements [`CloudPort`]. Two directions:
//!
//! - **Inbound**: a streaming subscription on the user's device subtree.
//!   Payload texts are surfaced raw through [`poll_inbound`]; the domain
//!   classifies them (snapshot vs delta) in `sync::decode_payload`.
//! - **Outbound**: merge writes (HTTP `PATCH` of the full record to
//!   `<url>/<userPath>/<id>.json?auth=<key>`) through a bounded pending
//!   queue. [`publish`](CloudPort::publish) only enqueues; [`flush`]
//!   sends when the node is online, so writes made offline drain on
//!   reconnect. A full queue or an exhausted retry budget drops the
//!   write — local truth is never blocked on the network.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF HTTP client calls.
//! - **all other targets**: an in-memory loopback for host tests.
//!
//! [`poll_inbound`]: CloudAdapter::poll_inbound
//! [`flush`]: CloudAdapter::flush

use log::{info, warn};

use crate::app::ports::CloudPort;
use crate::config::NodeConfig;
use crate::device::DeviceRecord;
use crate::error::CloudError;

/// Send attempts per pending write before it is dropped.
pub const MAX_PUBLISH_RETRY: u8 = 5;
/// Pending writes held while offline or failing.
pub const PUBLISH_QUEUE_DEPTH: usize = 10;

struct PendingWrite {
    record: DeviceRecord,
    attempts: u8,
}

/// Concrete [`CloudPort`] adapter over the remote JSON store.
pub struct CloudAdapter {
    devices_path: String,
    online: bool,
    streaming: bool,
    pending: heapless::Deque<PendingWrite, PUBLISH_QUEUE_DEPTH>,
    /// Simulation: inbound payloads queued by tests, outbound sends
    /// recorded for assertions.
    #[cfg(not(target_os = "espidf"))]
    sim_inbound: std::collections::VecDeque<String>,
    #[cfg(not(target_os = "espidf"))]
    sim_published: Vec<DeviceRecord>,
    #[cfg(not(target_os = "espidf"))]
    sim_fail_sends: u32,
}

impl CloudAdapter {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            devices_path: config.devices_path().to_string(),
            online: false,
            streaming: false,
            pending: heapless::Deque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_inbound: std::collections::VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_fail_sends: 0,
        }
    }

    /// Mark the node online/offline. Set from the main loop: WiFi up and
    /// wall clock synced.
    pub fn set_online(&mut self, online: bool) {
        if online != self.online {
            info!(
                "cloud: {}",
                if online { "online" } else { "offline" }
            );
        }
        self.online = online;
    }

    /// Whether the streaming subscription is open.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Number of writes waiting in the publish queue.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Open the streaming subscription on the device subtree. On failure
    /// the node keeps running offline; the caller decides when to retry.
    pub fn begin_stream(&mut self) -> Result<(), CloudError> {
        self.platform_begin_stream()?;
        self.streaming = true;
        info!("cloud: stream open on {}", self.devices_path);
        Ok(())
    }

    /// Next inbound payload text, if the stream delivered one.
    pub fn poll_inbound(&mut self) -> Option<String> {
        if !self.streaming {
            return None;
        }
        self.platform_poll_inbound()
    }

    /// Drain the pending queue while online. Each write gets up to
    /// [`MAX_PUBLISH_RETRY`] send attempts across flushes; exhaustion
    /// drops it with a warning. Stops at the first failure so ordering
    /// is preserved.
    pub fn flush(&mut self) {
        if !self.online {
            return;
        }
        while let Some(mut write) = self.pending.pop_front() {
            write.attempts += 1;
            match self.platform_send(&write.record) {
                Ok(()) => {}
                Err(e) => {
                    if write.attempts >= MAX_PUBLISH_RETRY {
                        warn!(
                            "cloud: publish for '{}' dropped after {} attempts ({})",
                            write.record.id, write.attempts, e
                        );
                    } else {
                        // Put it back at the head and try again next flush.
                        let _ = self.pending.push_front(write);
                    }
                    return;
                }
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin_stream(&mut self) -> Result<(), CloudError> {
        // Firebase streaming is a long-lived GET on
        // `<url>/<userPath>.json?auth=<key>` with `Accept:
        // text/event-stream`; `put`/`patch` events carry the payload
        // JSON this adapter surfaces through poll_inbound().
        //
        // The esp_http_client handle for the SSE connection is threaded
        // in from main.rs once the TLS cert bundle is mounted; until
        // then the node runs store-and-forward only.
        info!("cloud(espidf): stream subscription deferred until HTTP wiring");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_stream(&mut self) -> Result<(), CloudError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_poll_inbound(&mut self) -> Option<String> {
        None
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_poll_inbound(&mut self) -> Option<String> {
        self.sim_inbound.pop_front()
    }

    #[cfg(target_os = "espidf")]
    fn platform_send(&mut self, _record: &DeviceRecord) -> Result<(), CloudError> {
        // Merge write: PATCH `<url>/<userPath>/<id>.json?auth=<key>`
        // with the serialized record. Shares the esp_http_client wiring
        // noted in platform_begin_stream(). Until that lands nothing is
        // delivered, so the write must stay pending, not report success.
        Err(CloudError::WriteFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_send(&mut self, record: &DeviceRecord) -> Result<(), CloudError> {
        if self.sim_fail_sends > 0 {
            self.sim_fail_sends -= 1;
            return Err(CloudError::WriteFailed);
        }
        self.sim_published.push(record.clone());
        Ok(())
    }

    // ── Host-test hooks ───────────────────────────────────────

    /// Queue a raw payload as if the stream delivered it.
    #[cfg(not(target_os = "espidf"))]
    pub fn push_inbound(&mut self, payload: &str) {
        self.sim_inbound.push_back(payload.to_string());
    }

    /// Records successfully sent, in order.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[DeviceRecord] {
        &self.sim_published
    }

    /// Make the next `n` sends fail, exercising retry and drop paths.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_sends(&mut self, n: u32) {
        self.sim_fail_sends = n;
    }
}

impl CloudPort for CloudAdapter {
    fn is_online(&self) -> bool {
        self.online
    }

    fn publish(&mut self, record: &DeviceRecord) -> Result<(), CloudError> {
        let write = PendingWrite {
            record: record.clone(),
            attempts: 0,
        };
        if self.pending.push_back(write).is_err() {
            return Err(CloudError::QueueFull);
        }
        Ok(())
    }
}
