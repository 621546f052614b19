//! Time adapter — monotonic uptime plus the SNTP-synced wall clock.
//!
//! Alarms fire in wall-clock time, so [`TimePort::now_epoch_secs`] only
//! yields a value once the clock is plausibly synced; before that the
//! scheduler is held back and only button/remote commands run.
//!
//! - **`target_os = "espidf"`** — `esp_timer_get_time()` for uptime,
//!   `gettimeofday()` for the wall clock, SNTP via `esp_idf_svc::sntp`.
//! - **all other targets** — `std::time::Instant` for uptime and a
//!   settable simulated epoch for host tests.

use log::{info, warn};

use crate::app::ports::TimePort;

/// Boot-time attempts to observe a synced clock before degrading.
pub const NTP_RETRY_ATTEMPTS: u32 = 30;
/// Delay between sync checks.
pub const NTP_RETRY_DELAY_MS: u64 = 1_000;

/// Reject obviously unsynced time (before 2020-01-01).
const EPOCH_2020: i64 = 1_577_836_800;

/// SNTP-backed [`TimePort`] adapter.
pub struct SntpTimeAdapter {
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    sim_epoch: Option<u64>,
}

impl SntpTimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            sntp: None,
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            sim_epoch: None,
        }
    }

    /// Start the SNTP client and block until the wall clock looks synced
    /// or the attempt budget runs out. Returns whether the clock synced;
    /// on `false` the node runs without alarms until sync catches up.
    pub fn sync_with_retry(&mut self, attempts: u32) -> bool {
        if !self.platform_start_sntp() {
            return false;
        }
        for _ in 0..attempts {
            if self.now_epoch_secs().is_some() {
                info!("time: wall clock synced");
                return true;
            }
            std::thread::sleep(std::time::Duration::from_millis(NTP_RETRY_DELAY_MS));
        }
        warn!("time: clock not synced after {} attempts", attempts);
        false
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    /// Host-test hook: set the simulated wall clock.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_epoch(&mut self, epoch_secs: u64) {
        self.sim_epoch = Some(epoch_secs);
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_sntp(&mut self) -> bool {
        if self.sntp.is_some() {
            return true;
        }
        match esp_idf_svc::sntp::EspSntp::new_default() {
            Ok(handle) => {
                self.sntp = Some(handle);
                info!("time: SNTP client started");
                true
            }
            Err(e) => {
                warn!("time: SNTP start failed: {}", e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_sntp(&mut self) -> bool {
        true
    }
}

impl Default for SntpTimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
impl TimePort for SntpTimeAdapter {
    fn now_epoch_secs(&self) -> Option<u64> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if tv.tv_sec < EPOCH_2020 {
            return None;
        }
        Some(tv.tv_sec as u64)
    }
}

#[cfg(not(target_os = "espidf"))]
impl TimePort for SntpTimeAdapter {
    fn now_epoch_secs(&self) -> Option<u64> {
        self.sim_epoch
    }
}
