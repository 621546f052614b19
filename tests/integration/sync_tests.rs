//! Remote sync integration tests: delta application, snapshot three-way
//! reconciliation and payload classification at the dispatch boundary.

use crate::mock_hw::{record_a, MockCloud, MockPins, MockStore, RecordingSink};

use relayhub::app::commands::Command;
use relayhub::app::events::AppEvent;
use relayhub::app::service::RelayService;
use relayhub::error::ParseError;
use relayhub::sync::decode_payload;

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

    /// Decode a raw payload and dispatch it, as the main loop does.
    fn receive(&mut self, payload: &str) {
        let inbound = decode_payload(payload).expect("payload must classify");
        self.service.handle_command(
            Command::Remote(inbound),
            &mut self.pins,
            &mut self.cloud,
            &mut self.store,
            &mut self.sink,
        );
    }
}

// ── Scenario: remote delta while online ───────────────────────

#[test]
fn delta_actuates_persists_and_publishes() {
    let mut rec = record_a();
    rec.desired_state = 0;
    rec.observed_state = 0;
    let mut rig = Rig::boot(vec![rec]);
    assert_eq!(rig.pins.logical(5), 0);

    rig.receive(
        r#"{"id":"A","relayPin":5,"ledPin":4,"buttonPin":0,
            "desiredState":1,"defaultState":-1,"startTime":0,"endTime":0}"#,
    );

    assert_eq!(rig.pins.logical(5), 1);
    assert_eq!(rig.store.map["A"].desired_state, 1);
    assert_eq!(rig.service.alarms().active_count(), 0);
    assert_eq!(rig.cloud.published.len(), 1);
    assert!(rig.sink.events.contains(&AppEvent::DeltaApplied { id: "A".into() }));
}

#[test]
fn delta_for_unknown_device_materializes_it() {
    let mut rig = Rig::boot(vec![record_a()]);

    rig.receive(
        r#"{"id":"C","relayPin":20,"ledPin":21,"buttonPin":22,"desiredState":1}"#,
    );

    assert_eq!(rig.service.devices().len(), 2);
    let idx = rig.service.find("C").unwrap();
    assert_eq!(rig.service.device(idx).unwrap().desired_state, 1);
    assert_eq!(rig.pins.logical(20), 1);
}

#[test]
fn delta_pin_remap_is_deferred_until_reboot() {
    let mut rig = Rig::boot(vec![record_a()]);

    rig.receive(
        r#"{"id":"A","relayPin":9,"ledPin":8,"buttonPin":7,"desiredState":0}"#,
    );

    // The known pin map stays; only state and policy fields move.
    let live = rig.service.device(0).unwrap();
    assert_eq!(live.relay_pin, 5);
    assert_eq!(live.desired_state, 0);
    assert_eq!(rig.pins.logical(5), 0);
}

#[test]
fn delta_omitting_policy_fields_keeps_the_stored_policy() {
    let mut rec = record_a();
    rec.default_state = 1;
    rec.start_time = 28_800;
    let mut rig = Rig::boot(vec![rec]);
    assert!(rig.service.alarms().is_allocated(5));

    // State-only delta: no defaultState, no alarm times.
    rig.receive(r#"{"id":"A","relayPin":5,"ledPin":4,"buttonPin":0,"desiredState":0}"#);

    let live = rig.service.device(0).unwrap();
    assert_eq!(live.desired_state, 0);
    assert_eq!(live.default_state, 1);
    assert_eq!(live.start_time, 28_800);
    assert!(rig.service.alarms().is_allocated(5));
}

// ── Snapshot reconciliation ───────────────────────────────────

fn snapshot_entry(desired: u8, observed: u8, default: i8, start: u32, end: u32) -> String {
    format!(
        r#"{{"A":{{"relayPin":5,"ledPin":4,"buttonPin":0,"desiredState":{desired},
            "observedState":{observed},"defaultState":{default},
            "startTime":{start},"endTime":{end}}}}}"#
    )
}

#[test]
fn unchanged_snapshot_makes_zero_pin_writes_and_zero_publishes() {
    let mut rig = Rig::boot(vec![record_a()]); // logical 1 on pin 5
    let boot_writes = rig.pins.writes.len();

    rig.receive(&snapshot_entry(1, 1, -1, 0, 0));

    assert_eq!(rig.pins.writes.len(), boot_writes);
    assert!(rig.cloud.published.is_empty());
    // Memory and mirror refresh still happen.
    assert_eq!(rig.store.upserts, 1);
    assert!(rig.sink.events.contains(&AppEvent::SnapshotReconciled {
        devices: 1,
        repaired: 0
    }));
}

#[test]
fn snapshot_repairs_offline_drift() {
    let mut rig = Rig::boot(vec![record_a()]);
    // The relay drifted while we were away: logical 0 instead of 1.
    rig.pins.force_level(5, 0 ^ relayhub::pins::RELAY_WRITE_MASK);
    assert_eq!(rig.pins.logical(5), 0);

    rig.receive(&snapshot_entry(1, 1, -1, 0, 0));

    assert_eq!(rig.pins.logical(5), 1);
    assert_eq!(rig.cloud.published.len(), 1);
    assert!(rig.sink.events.contains(&AppEvent::SnapshotReconciled {
        devices: 1,
        repaired: 1
    }));
}

#[test]
fn snapshot_applies_boot_override() {
    let mut rig = Rig::boot(vec![record_a()]); // logical 1

    // Remote says this outlet must default to 0 and its record shows it
    // never took that state.
    rig.receive(&snapshot_entry(1, 1, 0, 0, 0));

    assert_eq!(rig.pins.logical(5), 0);
    let live = rig.service.device(0).unwrap();
    assert_eq!(live.desired_state, 0);
    assert_eq!(rig.cloud.published.len(), 1);
}

// ── Scenario: alarm creation then cancellation ────────────────

#[test]
fn snapshot_creates_then_cancels_the_on_alarm() {
    let mut rig = Rig::boot(vec![record_a()]);

    rig.receive(&snapshot_entry(1, 1, -1, 28_800, 72_000));
    assert!(rig.service.alarms().is_allocated(5));
    assert!(rig.service.alarms().is_allocated(6));

    rig.receive(&snapshot_entry(1, 1, -1, 0, 72_000));
    assert!(!rig.service.alarms().is_allocated(5));
    assert!(rig.service.alarms().is_allocated(6));
}

// ── Classification at the dispatch boundary ───────────────────

#[test]
fn malformed_payloads_classify_as_errors_not_panics() {
    assert_eq!(decode_payload("not json").unwrap_err(), ParseError::NotJson);
    assert_eq!(decode_payload("[1,2]").unwrap_err(), ParseError::NotAnObject);
    assert_eq!(
        decode_payload(r#"{"relayState":1}"#).unwrap_err(),
        ParseError::SchemaMismatch
    );
}

#[test]
fn write_path_is_idempotent_for_repeated_deltas() {
    let mut rig = Rig::boot(vec![record_a()]);
    let delta = r#"{"id":"A","relayPin":5,"ledPin":4,"buttonPin":0,"desiredState":0}"#;

    rig.receive(delta);
    let pins_after_first = rig.pins.level(5);
    let record_after_first = rig.service.device(0).unwrap().clone();

    rig.receive(delta);
    assert_eq!(rig.pins.level(5), pins_after_first);
    assert_eq!(*rig.service.device(0).unwrap(), record_after_first);
    assert_eq!(rig.store.map["A"], record_after_first);
    // Both publishes carry the identical record.
    assert_eq!(rig.cloud.published[0], rig.cloud.published[1]);
}
