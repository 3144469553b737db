//! Builds local snapshots from the store and writes remote snapshots back.
//!
//! Neither direction aborts on a single bad key: undecodable values are
//! carried as raw strings, failed writes are logged and skipped.

use crate::error::SyncError;
use crate::models::keys::{is_backup_key, BACKUP_KEYS};
use crate::models::{LocalSnapshot, RemoteSnapshot, FORMAT_VERSION};
use crate::services::sync_service;
use crate::store::KvStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-key result of applying a snapshot
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub written: Vec<String>,
    pub failed: Vec<SyncError>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// JSON-decodes a stored value, keeping the raw string if it is not JSON
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Strings are stored verbatim, everything else as JSON text
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads the allow-listed keys into a fresh snapshot.
///
/// `createdAt` is the local-change watermark when one is recorded. Without
/// one it is now, or the Unix epoch when the store holds no data at all, so
/// an empty install never outranks an existing backup.
pub fn build_local_snapshot(store: &dyn KvStore, device_id: &str) -> LocalSnapshot {
    let mut entries = BTreeMap::new();

    for key in BACKUP_KEYS {
        match store.get(key) {
            Ok(Some(raw)) => {
                entries.insert(key.to_string(), decode_value(&raw));
            }
            Ok(None) => {}
            Err(e) => log::warn!("Skipping unreadable key {} in snapshot: {}", key, e),
        }
    }

    let unrecorded = || {
        if entries.is_empty() {
            DateTime::<Utc>::UNIX_EPOCH
        } else {
            Utc::now()
        }
    };
    let created_at = match sync_service::local_change_watermark(store) {
        Ok(Some(at)) => at,
        Ok(None) => unrecorded(),
        Err(e) => {
            log::warn!("Could not read local change watermark: {}", e);
            unrecorded()
        }
    };

    LocalSnapshot {
        format_version: FORMAT_VERSION,
        created_at,
        device_id: device_id.to_string(),
        entries,
    }
}

/// Writes the snapshot entries into the store, one key at a time.
///
/// Keys outside the allow-list are ignored. A failing key is recorded in
/// the report and does not stop the remaining keys.
pub fn apply_remote_snapshot(store: &dyn KvStore, remote: &RemoteSnapshot) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (key, value) in &remote.entries {
        if !is_backup_key(key) {
            log::debug!("Ignoring non-synced key {} from remote snapshot", key);
            continue;
        }

        match store.set(key, &encode_value(value)) {
            Ok(()) => report.written.push(key.clone()),
            Err(e) => {
                log::warn!("Failed to apply key {}: {}", key, e);
                report.failed.push(SyncError::LocalWrite {
                    key: key.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "Applied remote snapshot from {}: {} keys written, {} failed",
        remote.sync_info.device_id,
        report.written.len(),
        report.failed.len()
    );
    report
}
