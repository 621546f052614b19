//! Relayhub firmware — main entry point.
//!
//! Hexagonal architecture with a single-threaded cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioAdapter    JsonFileStore   CloudAdapter    LogEventSink   │
//! │  (PinPort)      (StorePort)     (CloudPort)     (EventSink)    │
//! │  WifiAdapter    SntpTimeAdapter                                │
//! │  (station)      (TimePort)                                     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            RelayService (pure logic)                   │    │
//! │  │  write path · snapshot/delta reconcile · alarms        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ButtonDriver (per device) · AlarmRegistry (delegate-driven)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use relayhub::adapters::cloud::CloudAdapter;
use relayhub::adapters::fs_store::JsonFileStore;
use relayhub::adapters::hardware::{self, GpioAdapter};
use relayhub::adapters::log_sink::LogEventSink;
use relayhub::adapters::time::{SntpTimeAdapter, NTP_RETRY_ATTEMPTS};
use relayhub::adapters::wifi::{WifiAdapter, WIFI_RETRY_ATTEMPTS};
use relayhub::app::commands::Command;
use relayhub::app::events::AppEvent;
use relayhub::app::ports::{EventSink, PinPort, TimePort};
use relayhub::app::service::RelayService;
use relayhub::config::NodeConfig;
use relayhub::drivers::button::ButtonEvent;
use relayhub::sync::decode_payload;

/// Flash paths on the mounted data partition (registered at boot by the
/// littlefs component per sdkconfig).
const CONFIG_PATH: &str = "/littlefs/config.json";
const DATA_PATH: &str = "/littlefs/data.json";

/// Main loop cadence.
const LOOP_TICK_MS: u64 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Relayhub v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (fatal if missing or invalid) ────────
    let config_text = std::fs::read_to_string(CONFIG_PATH)
        .with_context(|| format!("config file {CONFIG_PATH} unreadable"))?;
    let config = NodeConfig::from_json(&config_text).context("config rejected")?;
    info!("Config loaded for path {}", config.devices_path());

    // ── 3. Construct adapters ─────────────────────────────────
    let mut gpio = GpioAdapter::new();
    let mut store = JsonFileStore::new(DATA_PATH);
    let mut cloud = CloudAdapter::new(&config);
    let mut sink = LogEventSink::new();
    let mut time = SntpTimeAdapter::new();
    let mut wifi = WifiAdapter::new();

    // ── 4. Boot the service from the local mirror ─────────────
    // Pins are driven before any network activity, so outlets come back
    // in a deterministic state even with the router down.
    use relayhub::app::ports::StorePort;
    let records = store.hydrate();
    let mut service = RelayService::new();
    service.boot(records, &mut gpio, &mut cloud, &mut store, &mut sink);

    let mut buttons = service.make_buttons();
    for button in &buttons {
        gpio.configure_input(button.pin());
    }

    // ── 5. Network bring-up (degrades to offline mode) ────────
    let mut clock_synced = false;
    if let Err(e) = wifi.set_credentials(&config.wifi_ap, &config.wifi_pass) {
        warn!("WiFi credentials rejected ({}), running offline", e);
    } else if wifi.connect_with_retry(WIFI_RETRY_ATTEMPTS) {
        clock_synced = time.sync_with_retry(NTP_RETRY_ATTEMPTS);
        if let Err(e) = cloud.begin_stream() {
            warn!("Cloud stream failed ({}), running store-and-forward only", e);
        }
    }
    cloud.set_online(wifi.is_connected() && clock_synced);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        let now_ms = time.uptime_ms();

        // Buttons: sample, debounce, classify.
        for button in &mut buttons {
            let level = gpio.read_level(button.pin());
            match button.tick(now_ms, level) {
                Some(ButtonEvent::Click) => {
                    service.handle_command(
                        Command::ButtonClick {
                            device_index: button.device_index(),
                        },
                        &mut gpio,
                        &mut cloud,
                        &mut store,
                        &mut sink,
                    );
                }
                Some(ButtonEvent::FactoryReset) => {
                    sink.emit(&AppEvent::FactoryResetRequested);
                    hardware::reboot();
                }
                None => {}
            }
        }

        // Alarms: held back until the wall clock is synced.
        if let Some(epoch) = time.now_epoch_secs() {
            clock_synced = true;
            service.pump_alarms(epoch, &mut gpio, &mut cloud, &mut store, &mut sink);
        }

        // Remote stream: classify and dispatch; undecodable payloads are
        // dropped, never fatal.
        while let Some(payload) = cloud.poll_inbound() {
            match decode_payload(&payload) {
                Ok(inbound) => {
                    service.handle_command(
                        Command::Remote(inbound),
                        &mut gpio,
                        &mut cloud,
                        &mut store,
                        &mut sink,
                    );
                }
                Err(e) => warn!("cloud: inbound payload dropped ({})", e),
            }
        }

        // Outbound queue, link supervision, online gating.
        cloud.flush();
        wifi.poll();
        cloud.set_online(wifi.is_connected() && clock_synced);

        std::thread::sleep(std::time::Duration::from_millis(LOOP_TICK_MS));
    }
}
