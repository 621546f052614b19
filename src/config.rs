//! Node configuration.
//!
//! Persisted as a small JSON document (`config.json`, ≤ 250 bytes) on the
//! flash filesystem. A missing or unparseable configuration is fatal to
//! boot: the device stays inert rather than guessing credentials.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// WiFi credentials and remote store coordinates for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// WiFi access point SSID.
    pub wifi_ap: String,
    /// WiFi passphrase (empty for an open network).
    pub wifi_pass: String,
    /// Base URL of the remote store.
    pub firebase_url: String,
    /// Database auth secret.
    pub firebase_key: String,
    /// Per-user subscription path, e.g. `users/<userId>/devices`.
    pub user_path: String,
}

impl NodeConfig {
    /// Parse a configuration document and validate it.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let cfg: Self =
            serde_json::from_str(text).map_err(|_| Error::Config("config file unparseable"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range/shape validation. Invalid configs are rejected, not repaired.
    pub fn validate(&self) -> Result<(), Error> {
        if self.wifi_ap.is_empty() || self.wifi_ap.len() > 32 {
            return Err(Error::Config("wifiAp must be 1-32 bytes"));
        }
        if self.wifi_pass.len() > 64 {
            return Err(Error::Config("wifiPass must be at most 64 bytes"));
        }
        if self.firebase_url.is_empty() {
            return Err(Error::Config("firebaseUrl must not be empty"));
        }
        if self.firebase_key.is_empty() {
            return Err(Error::Config("firebaseKey must not be empty"));
        }
        if self.user_path.is_empty() {
            return Err(Error::Config("userPath must not be empty"));
        }
        Ok(())
    }

    /// Subscription path for the whole device mapping.
    pub fn devices_path(&self) -> &str {
        self.user_path.trim_end_matches('/')
    }

    /// Merge-write path for a single device node.
    pub fn device_path(&self, device_id: &str) -> String {
        format!("{}/{}", self.devices_path(), device_id)
    }
}
