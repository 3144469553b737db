//! Persisted key names.
//!
//! `BACKUP_KEYS` is the allow-list of everything sync treats as "the data";
//! a key missing here is invisible to snapshots and conflict resolution.

/// Allow-listed data and settings keys
pub const BACKUP_KEYS: &[&str] = &[
    "memos",
    "calendarMemos",
    "stickyMemos",
    "memoFolders",
    "appSettings",
    "themeSettings",
    "fontSettings",
    "alarmConfirmations",
    "holidaySettings",
    "calendarViewSettings",
];

/// Stable per-installation identifier
pub const DEVICE_ID_KEY: &str = "sync_device_id";

/// Persisted [`FolderSelection`](crate::models::FolderSelection)
pub const FOLDER_SELECTION_KEY: &str = "gdrive_backup_folder";

/// Informational timestamp of the last successful sync round
pub const LAST_SYNC_TIME_KEY: &str = "lastSyncTime";

/// User toggle for automatic sync ("true"/"false", absent means enabled)
pub const AUTO_SYNC_ENABLED_KEY: &str = "autoSyncEnabled";

/// Watermark of the local data the next snapshot is stamped with
pub const LAST_LOCAL_CHANGE_KEY: &str = "lastLocalChange";

/// Stamp of the snapshot this device last uploaded or downloaded
pub const LAST_SYNCED_SNAPSHOT_KEY: &str = "lastSyncedSnapshot";

/// Whether `key` takes part in sync
pub fn is_backup_key(key: &str) -> bool {
    BACKUP_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_keys_are_not_synced() {
        assert!(is_backup_key("memos"));
        for key in [
            DEVICE_ID_KEY,
            FOLDER_SELECTION_KEY,
            LAST_SYNC_TIME_KEY,
            AUTO_SYNC_ENABLED_KEY,
            LAST_LOCAL_CHANGE_KEY,
            LAST_SYNCED_SNAPSHOT_KEY,
            drive_auth::ACCESS_TOKEN_KEY,
        ] {
            assert!(!is_backup_key(key), "{} must stay device-local", key);
        }
    }
}
