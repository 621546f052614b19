//! Write-path integration tests: button clicks, alarm firings and the
//! degradation policy for store/cloud failures.

use crate::mock_hw::{record_a, MockCloud, MockPins, MockStore, RecordingSink};

use relayhub::app::commands::Command;
use relayhub::app::events::AppEvent;
use relayhub::app::service::RelayService;
use relayhub::drivers::button::{ButtonDriver, ButtonEvent};

struct Rig {
    service: RelayService,
    pins: MockPins,
    cloud: MockCloud,
    store: MockStore,
    sink: RecordingSink,
}

impl Rig {
    fn boot(records: Vec<relayhub::device::DeviceRecord>) -> Self {
        let mut rig = Self {
            service: RelayService::new(),
            pins: MockPins::new(),
            cloud: MockCloud::online(),
            store: MockStore::with_records(records.clone()),
            sink: RecordingSink::new(),
        };
        rig.service.boot(
            records,
            &mut rig.pins,
            &mut rig.cloud,
            &mut rig.store,
            &mut rig.sink,
        );
        rig
    }

    fn dispatch(&mut self, cmd: Command) {
        self.service.handle_command(
            cmd,
            &mut self.pins,
            &mut self.cloud,
            &mut self.store,
            &mut self.sink,
        );
    }
}

// ── Scenario: button click on active relay ────────────────────

#[test]
fn click_on_active_relay_toggles_off_everywhere() {
    let mut rig = Rig::boot(vec![record_a()]); // boots to logical 1
    assert_eq!(rig.pins.logical(5), 1);

    rig.dispatch(Command::ButtonClick { device_index: 0 });

    assert_eq!(rig.pins.logical(5), 0);
    assert_eq!(rig.pins.level(4), 0);
    let live = rig.service.device(0).unwrap();
    assert_eq!(live.desired_state, 0);
    assert_eq!(live.observed_state, 0);
    assert_eq!(rig.store.map["A"].desired_state, 0);
    assert_eq!(rig.cloud.published.len(), 1);
    assert_eq!(rig.cloud.published[0].desired_state, 0);
}

#[test]
fn two_clicks_round_trip_the_state() {
    let mut rig = Rig::boot(vec![record_a()]);
    rig.dispatch(Command::ButtonClick { device_index: 0 });
    rig.dispatch(Command::ButtonClick { device_index: 0 });

    assert_eq!(rig.pins.logical(5), 1);
    assert_eq!(rig.service.device(0).unwrap().desired_state, 1);
    assert_eq!(rig.store.map["A"], *rig.service.device(0).unwrap());
}

#[test]
fn click_on_dead_index_is_a_no_op() {
    let mut rig = Rig::boot(vec![record_a()]);
    rig.dispatch(Command::ButtonClick { device_index: 7 });
    assert!(rig.cloud.published.is_empty());
    assert_eq!(rig.store.upserts, 0);
}

// ── Alarm firings ─────────────────────────────────────────────

#[test]
fn alarm_firing_toggles_through_the_write_path() {
    let mut rec = record_a();
    rec.desired_state = 0;
    rec.observed_state = 0;
    rec.start_time = 28_800;
    let mut rig = Rig::boot(vec![rec]);

    // Anchor just before 08:00, then cross it.
    rig.pump(28_790);
    rig.pump(28_805);

    assert_eq!(rig.pins.logical(5), 1);
    assert_eq!(rig.service.device(0).unwrap().desired_state, 1);
    assert_eq!(rig.cloud.published.len(), 1);
    assert_eq!(rig.store.map["A"].desired_state, 1);
}

#[test]
fn alarms_keep_firing_and_publishing_while_marked_offline() {
    let mut rec = record_a();
    rec.desired_state = 0;
    rec.observed_state = 0;
    rec.end_time = 72_000;
    let mut rig = Rig::boot(vec![rec]);
    rig.cloud.online = false;

    rig.pump(71_995);
    rig.pump(72_000);

    // The write still lands locally; the publish is queued by the real
    // adapter and drains on reconnect.
    assert_eq!(rig.pins.logical(5), 1);
    assert_eq!(rig.store.map["A"].desired_state, 1);
    assert_eq!(rig.cloud.published.len(), 1);
}

impl Rig {
    fn pump(&mut self, epoch: u64) {
        self.service.pump_alarms(
            epoch,
            &mut self.pins,
            &mut self.cloud,
            &mut self.store,
            &mut self.sink,
        );
    }
}

// ── Degradation policy ────────────────────────────────────────

#[test]
fn publish_failure_is_reported_but_state_still_lands() {
    let mut rig = Rig::boot(vec![record_a()]);
    rig.cloud.fail_publishes = 1;

    rig.dispatch(Command::ButtonClick { device_index: 0 });

    assert_eq!(rig.pins.logical(5), 0);
    assert_eq!(rig.store.map["A"].desired_state, 0);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::PublishFailed { id: "A".into() }));
    // The write path still completed.
    assert_eq!(rig.sink.count_state_written(), 1);
}

#[test]
fn store_failure_leaves_memory_authoritative() {
    let mut rig = Rig::boot(vec![record_a()]);
    rig.store.fail_writes = true;

    rig.dispatch(Command::ButtonClick { device_index: 0 });

    assert_eq!(rig.service.device(0).unwrap().desired_state, 0);
    assert_eq!(rig.store.map["A"].desired_state, 1); // stale mirror
    assert_eq!(rig.cloud.published.len(), 1); // publish unaffected
}

// ── Long press ────────────────────────────────────────────────

#[test]
fn long_press_requests_reset_without_touching_state() {
    let rig = Rig::boot(vec![record_a()]);
    let mut button = ButtonDriver::new(0, 0, 0);

    button.tick(0, 0);
    button.tick(60, 0);
    assert_eq!(button.tick(6_000, 0), Some(ButtonEvent::FactoryReset));

    // No partial state was written by gesture detection itself.
    assert!(rig.cloud.published.is_empty());
    assert_eq!(rig.store.upserts, 0);
}
