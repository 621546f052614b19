//! Local mirror adapter — a JSON document on flash.
//!
//! Implements [`StorePort`] over a single file (`data.json` on the
//! ESP-IDF LittleFS/SPIFFS mount, any path under host tests). The whole
//! mirror is one JSON object keyed by device id, matching the remote
//! snapshot shape, so both sides decode with the same schema.
//!
//! Every transaction (hydrate, or an upsert's read-modify-write) runs
//! under a process-wide lock, and writes land via temp-file-plus-rename:
//! a hydration concurrent with an upsert sees the pre- or post-image,
//! never a torn document, and no upsert overwrites another's insert.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{info, warn};

use crate::app::ports::StorePort;
use crate::device::DeviceRecord;
use crate::error::StoreError;

/// Serializes mirror transactions across the process.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

/// [`StorePort`] backed by one JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }

    /// Parse the on-flash document into the keyed map. Any failure is a
    /// warn-and-empty: a corrupt mirror must never stop the node.
    fn read_map(&self) -> BTreeMap<String, DeviceRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("store: no mirror at {}, starting empty", self.path.display());
                return BTreeMap::new();
            }
            Err(e) => {
                warn!("store: mirror read failed ({}), starting empty", e);
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, DeviceRecord>>(&text) {
            Ok(map) => map,
            Err(e) => {
                warn!("store: mirror corrupt ({}), starting empty", e);
                BTreeMap::new()
            }
        }
    }

    /// Caller holds [`WRITE_LOCK`].
    fn write_map(&self, map: &BTreeMap<String, DeviceRecord>) -> Result<(), StoreError> {
        let text = serde_json::to_string(map).map_err(|_| StoreError::EncodeFailed)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, text.as_bytes()).map_err(|_| StoreError::WriteFailed)?;
        fs::rename(&tmp, &self.path).map_err(|_| StoreError::WriteFailed)
    }
}

impl StorePort for JsonFileStore {
    fn hydrate(&mut self) -> Vec<DeviceRecord> {
        let _guard = WRITE_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let map = self.read_map();
        let records: Vec<DeviceRecord> = map
            .into_iter()
            .map(|(key, mut rec)| {
                if rec.id.is_empty() {
                    rec.id = key;
                }
                rec.normalized()
            })
            .collect();
        info!("store: hydrated {} device(s)", records.len());
        records
    }

    fn upsert(&mut self, record: &DeviceRecord) -> Result<(), StoreError> {
        // The read half must sit inside the bracket too, or two upserts
        // can interleave and one insert is lost.
        let _guard = WRITE_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let mut map = self.read_map();
        map.insert(record.id.clone(), record.clone());
        self.write_map(&map)
    }
}
