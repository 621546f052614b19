//! Inbound remote payload classification and decode.
//!
//! The remote store pushes one of two shapes on the subscription path:
//!
//! - a **delta** — a single full record carrying a top-level `id`;
//! - a **snapshot** — a mapping from device id to full record, delivered
//!   on (re)connection.
//!
//! The distinguisher is the wire contract's own heuristic: a top-level
//! `id` string marks a delta; otherwise an object whose values are
//! objects is a snapshot. Anything else is a schema mismatch and the
//! event is dropped — malformed remote data must never crash the device.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::device::DeviceRecord;
use crate::error::ParseError;

/// Which optional policy fields a delta explicitly carried on the wire.
///
/// Missing fields decode to their serde defaults, which must not be
/// mistaken for remote intent: a device keeps its stored policy for any
/// field the payload omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaFields {
    pub button_active_level: bool,
    pub default_state: bool,
    pub start_time: bool,
    pub end_time: bool,
}

impl DeltaFields {
    /// Every field present. Snapshot entries are full records by
    /// contract, so they merge with this mask.
    pub fn all() -> Self {
        Self {
            button_active_level: true,
            default_state: true,
            start_time: true,
            end_time: true,
        }
    }

    fn from_object(obj: &serde_json::Map<String, Value>) -> Self {
        Self {
            button_active_level: obj.contains_key("buttonActiveLevel"),
            default_state: obj.contains_key("defaultState"),
            start_time: obj.contains_key("startTime"),
            end_time: obj.contains_key("endTime"),
        }
    }
}

/// A classified inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    /// Single-device update, applied unconditionally. `carried` marks
    /// the policy fields the payload actually named.
    Delta {
        record: DeviceRecord,
        carried: DeltaFields,
    },
    /// Full mapping of all devices, reconciled three-way per entry.
    Snapshot(BTreeMap<String, DeviceRecord>),
}

/// Classify and decode one payload document.
pub fn decode_payload(text: &str) -> Result<InboundPayload, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ParseError::NotJson)?;
    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

    if obj.get("id").is_some_and(Value::is_string) {
        let carried = DeltaFields::from_object(obj);
        let rec: DeviceRecord =
            serde_json::from_value(value).map_err(|_| ParseError::SchemaMismatch)?;
        return Ok(InboundPayload::Delta {
            record: rec.normalized(),
            carried,
        });
    }

    // Snapshot: every entry must itself be an object. A flat record that
    // lost its id would otherwise masquerade as a one-entry snapshot.
    if obj.values().all(Value::is_object) {
        let map: BTreeMap<String, DeviceRecord> =
            serde_json::from_value(value).map_err(|_| ParseError::SchemaMismatch)?;
        let map = map
            .into_iter()
            .map(|(key, mut rec)| {
                if rec.id.is_empty() {
                    rec.id = key.clone();
                }
                (key, rec.normalized())
            })
            .collect();
        return Ok(InboundPayload::Snapshot(map));
    }

    Err(ParseError::SchemaMismatch)
}
