// Export/Import of a local backup file

use crate::error::SyncError;
use crate::models::{LocalSnapshot, RemoteSnapshot};
use crate::services::snapshot_codec::{self, ApplyReport};
use crate::services::sync_service;
use crate::store::KvStore;
use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

pub fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports")
}

/// Writes the current local snapshot as `memo-backup-<timestamp>.json` into `dir`
pub fn export_backup(store: &dyn KvStore, device_id: &str, dir: &Path) -> Result<PathBuf, SyncError> {
    fs::create_dir_all(dir)?;

    let timestamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let export_path = dir.join(format!("memo-backup-{}.json", timestamp));

    let snapshot = snapshot_codec::build_local_snapshot(store, device_id);
    let json = serde_json::to_vec_pretty(&snapshot)?;
    fs::write(&export_path, json)?;

    log::info!(
        "Exported {} keys to {}",
        snapshot.entries.len(),
        export_path.display()
    );
    Ok(export_path)
}

/// Reads a backup written by [`export_backup`] or a downloaded sync object
fn read_backup(bytes: &[u8]) -> Result<RemoteSnapshot, SyncError> {
    if let Ok(remote) = RemoteSnapshot::from_bytes(bytes) {
        return Ok(remote);
    }
    let local: LocalSnapshot =
        serde_json::from_slice(bytes).map_err(|e| SyncError::Decode(e.to_string()))?;
    Ok(RemoteSnapshot::from_local(&local, None))
}

/// Applies a backup file to the store.
///
/// Keys are written one by one like a download. The import counts as a
/// local change, so the next sync pushes it to the cloud.
pub fn import_backup(
    store: &dyn KvStore,
    file: &Path,
    tolerance: Duration,
) -> Result<ApplyReport, SyncError> {
    let bytes = fs::read(file)?;
    let snapshot = read_backup(&bytes)?;

    let report = snapshot_codec::apply_remote_snapshot(store, &snapshot);
    if !report.written.is_empty() {
        sync_service::record_local_change(store, Utc::now(), tolerance)?;
    }

    log::info!(
        "Imported {} keys from {} ({} failed)",
        report.written.len(),
        file.display(),
        report.failed.len()
    );
    Ok(report)
}
