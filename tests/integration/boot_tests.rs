//! Boot-path integration tests: hydration, pin materialization and the
//! `defaultState` rule, against mock adapters.

use crate::mock_hw::{record_a, record_b, MockCloud, MockPins, MockStore, RecordingSink};

use relayhub::app::events::AppEvent;
use relayhub::app::service::RelayService;

fn boot(records: Vec<relayhub::device::DeviceRecord>) -> (RelayService, MockPins, MockCloud, MockStore, RecordingSink) {
    let mut service = RelayService::new();
    let mut pins = MockPins::new();
    let mut cloud = MockCloud::new();
    let mut store = MockStore::with_records(records.clone());
    let mut sink = RecordingSink::new();
    service.boot(records, &mut pins, &mut cloud, &mut store, &mut sink);
    (service, pins, cloud, store, sink)
}

// ── Scenario: cold boot, offline, restore policy ──────────────

#[test]
fn cold_boot_restores_persisted_state_with_no_remote_activity() {
    let (service, pins, cloud, store, sink) = boot(vec![record_a()]);

    // Relay driven to logical 1 (electrical polarity applied), LED mirrors.
    assert_eq!(pins.logical(5), 1);
    assert_eq!(pins.level(4), 1);
    assert!(pins.configured.contains(&5));
    assert!(pins.configured.contains(&4));

    // Button registered, no alarms, no store churn, no publishes.
    let buttons = service.make_buttons();
    assert_eq!(buttons.len(), 1);
    assert_eq!(buttons[0].pin(), 0);
    assert_eq!(service.alarms().active_count(), 0);
    assert_eq!(store.upserts, 0);
    assert!(cloud.published.is_empty());

    assert_eq!(sink.events, vec![AppEvent::Started { devices: 1 }]);
    assert_eq!(service.device(0).unwrap().observed_state, 1);
}

// ── Scenario: boot with defaultState = 0 override ─────────────

#[test]
fn boot_override_forces_default_and_publishes() {
    let mut rec = record_a();
    rec.desired_state = 1;
    rec.default_state = 0;
    let (service, pins, cloud, store, sink) = boot(vec![rec]);

    assert_eq!(pins.logical(5), 0);
    let live = service.device(0).unwrap();
    assert_eq!(live.desired_state, 0);
    assert_eq!(live.observed_state, 0);

    // Full write path ran: mirror rewritten, remote publish queued.
    assert_eq!(store.upserts, 1);
    assert_eq!(store.map["A"].desired_state, 0);
    assert_eq!(cloud.published.len(), 1);
    assert_eq!(cloud.published[0].desired_state, 0);
    assert_eq!(sink.count_state_written(), 1);
}

#[test]
fn boot_override_matching_persisted_state_skips_the_write_path() {
    let mut rec = record_a();
    rec.desired_state = 1;
    rec.default_state = 1;
    let (_, pins, cloud, store, _) = boot(vec![rec]);

    assert_eq!(pins.logical(5), 1);
    assert_eq!(store.upserts, 0);
    assert!(cloud.published.is_empty());
}

// ── Materialization rules ─────────────────────────────────────

#[test]
fn boot_materializes_multiple_devices_on_disjoint_pins() {
    let (service, pins, _, _, _) = boot(vec![record_a(), record_b()]);
    assert_eq!(service.devices().len(), 2);
    assert_eq!(pins.logical(5), 1);
    assert_eq!(pins.logical(12), 0);
    assert_eq!(service.make_buttons().len(), 2);
}

#[test]
fn pin_collision_drops_the_later_record() {
    let mut clash = record_b();
    clash.button_pin = 5; // collides with A's relay
    let (service, _, _, _, sink) = boot(vec![record_a(), clash]);

    assert_eq!(service.devices().len(), 1);
    assert_eq!(service.devices()[0].id, "A");
    assert_eq!(sink.events, vec![AppEvent::Started { devices: 1 }]);
}

#[test]
fn adjacent_relay_pins_collide_on_alarm_slots() {
    // A's off-alarm slot is relay+1 = 6; a second device with relay 6
    // would claim that same slot as its on-alarm.
    let mut rec = record_a();
    rec.end_time = 72_000;
    let mut neighbour = record_b();
    neighbour.relay_pin = 6;
    neighbour.start_time = 100;

    let (service, _, _, _, _) = boot(vec![rec, neighbour]);

    assert_eq!(service.devices().len(), 1);
    assert_eq!(service.devices()[0].id, "A");
    assert_eq!(service.alarms().slot_owner(6), Some(0));
}

#[test]
fn non_distinct_pins_drop_the_record() {
    let mut rec = record_a();
    rec.led_pin = rec.relay_pin;
    let (service, _, _, _, _) = boot(vec![rec]);
    assert!(service.devices().is_empty());
}

#[test]
fn boot_installs_alarms_from_persisted_times() {
    let mut rec = record_a();
    rec.start_time = 28_800;
    rec.end_time = 72_000;
    let (service, _, _, _, _) = boot(vec![rec]);

    assert!(service.alarms().is_allocated(5));
    assert!(service.alarms().is_allocated(6));
    assert_eq!(service.alarms().slot_owner(5), Some(0));
}
