use crate::error::SyncError;
use crate::models::keys::{
    AUTO_SYNC_ENABLED_KEY, FOLDER_SELECTION_KEY, LAST_LOCAL_CHANGE_KEY,
    LAST_SYNCED_SNAPSHOT_KEY, LAST_SYNC_TIME_KEY,
};
use crate::models::FolderSelection;
use crate::store::KvStore;
use chrono::{DateTime, Duration, Utc};

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Loads the persisted backup folder choice.
///
/// An unreadable record is treated as absent so resolution can start over.
pub fn load_folder_selection(store: &dyn KvStore) -> Result<Option<FolderSelection>, SyncError> {
    let Some(raw) = store.get(FOLDER_SELECTION_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<FolderSelection>(&raw) {
        Ok(selection) => Ok(Some(selection)),
        Err(e) => {
            log::warn!("Ignoring unreadable folder selection: {}", e);
            Ok(None)
        }
    }
}

/// Saves or replaces the backup folder choice
pub fn save_folder_selection(
    store: &dyn KvStore,
    selection: &FolderSelection,
) -> Result<(), SyncError> {
    let raw = serde_json::to_string(selection)?;
    store.set(FOLDER_SELECTION_KEY, &raw)?;
    Ok(())
}

/// Forgets the backup folder choice
pub fn clear_folder_selection(store: &dyn KvStore) -> Result<(), SyncError> {
    store.remove(FOLDER_SELECTION_KEY)?;
    Ok(())
}

/// Updates the timestamp of the last successful synchronization
pub fn update_last_sync(store: &dyn KvStore, at: DateTime<Utc>) -> Result<(), SyncError> {
    store.set(LAST_SYNC_TIME_KEY, &at.to_rfc3339())?;
    Ok(())
}

pub fn last_sync_time(store: &dyn KvStore) -> Result<Option<DateTime<Utc>>, SyncError> {
    Ok(store
        .get(LAST_SYNC_TIME_KEY)?
        .as_deref()
        .and_then(parse_timestamp))
}

/// Whether the user allows automatic sync; absent means enabled
pub fn is_auto_sync_enabled(store: &dyn KvStore) -> Result<bool, SyncError> {
    Ok(store
        .get(AUTO_SYNC_ENABLED_KEY)?
        .map(|v| v.trim() != "false")
        .unwrap_or(true))
}

/// Enables or disables automatic synchronization
pub fn set_auto_sync_enabled(store: &dyn KvStore, enabled: bool) -> Result<(), SyncError> {
    store.set(AUTO_SYNC_ENABLED_KEY, if enabled { "true" } else { "false" })?;
    Ok(())
}

/// Timestamp the local data is considered current as of
pub fn local_change_watermark(store: &dyn KvStore) -> Result<Option<DateTime<Utc>>, SyncError> {
    Ok(store
        .get(LAST_LOCAL_CHANGE_KEY)?
        .as_deref()
        .and_then(parse_timestamp))
}

pub fn set_local_change_watermark(store: &dyn KvStore, at: DateTime<Utc>) -> Result<(), SyncError> {
    store.set(LAST_LOCAL_CHANGE_KEY, &at.to_rfc3339())?;
    Ok(())
}

/// Stamp of the snapshot both sides last agreed on
pub fn last_synced_snapshot(store: &dyn KvStore) -> Result<Option<DateTime<Utc>>, SyncError> {
    Ok(store
        .get(LAST_SYNCED_SNAPSHOT_KEY)?
        .as_deref()
        .and_then(parse_timestamp))
}

/// Records a local write made at `now` and returns the new watermark.
///
/// The watermark never moves backwards, and it lands at least `tolerance`
/// past the last agreed snapshot so the write is never taken for a copy of it.
pub fn record_local_change(
    store: &dyn KvStore,
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<DateTime<Utc>, SyncError> {
    let mut at = now;
    if let Some(synced) = last_synced_snapshot(store)? {
        at = at.max(synced + tolerance);
    }
    if let Some(current) = local_change_watermark(store)? {
        at = at.max(current);
    }
    set_local_change_watermark(store, at)?;
    Ok(at)
}

/// Moves the watermark to `synced` once a cycle uploaded or downloaded it.
///
/// `seen` is the watermark the cycle read before building its snapshot. If a
/// write was recorded since, the watermark stays where that write put it and
/// at least `tolerance` past `synced`, so the next cycle still uploads it.
pub fn settle_local_change_watermark(
    store: &dyn KvStore,
    seen: Option<DateTime<Utc>>,
    synced: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), SyncError> {
    store.set(LAST_SYNCED_SNAPSHOT_KEY, &synced.to_rfc3339())?;

    let at = match local_change_watermark(store)? {
        Some(current) if Some(current) != seen => {
            log::debug!("Local change at {} arrived during sync", current);
            current.max(synced + tolerance)
        }
        _ => synced,
    };
    set_local_change_watermark(store, at)
}
