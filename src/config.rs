use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings of the sync engine.
///
/// Every field has a default, so a partial (or missing) TOML file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Period of the automatic sync timer while authenticated
    pub auto_sync_interval_secs: u64,
    /// How often the credential is re-evaluated
    pub auth_poll_interval_secs: u64,
    /// Quiet period after a data change before an immediate sync
    pub debounce_secs: u64,
    /// Timestamps closer than this are treated as converged
    pub conflict_tolerance_secs: i64,
    /// Name of the Drive folder created for backups
    pub folder_name: String,
    /// Well-known name of the snapshot object inside the folder
    pub snapshot_file_name: String,
    /// Upper bound of folders returned by a listing
    pub folder_page_size: u32,
    pub api_base_url: String,
    pub upload_base_url: String,
    pub request_timeout_secs: u64,
    /// Number of session log entries kept in memory
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync_interval_secs: 300,
            auth_poll_interval_secs: 10,
            debounce_secs: 5,
            conflict_tolerance_secs: 30,
            folder_name: "MemoCalendar Backup".to_string(),
            snapshot_file_name: "memo-calendar-autosync.json".to_string(),
            folder_page_size: 100,
            api_base_url: "https://www.googleapis.com".to_string(),
            upload_base_url: "https://www.googleapis.com".to_string(),
            request_timeout_secs: 60,
            history_limit: 500,
        }
    }
}

impl SyncConfig {
    /// Loads the configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, SyncError> {
        let config: SyncConfig = toml::from_str(raw)
            .map_err(|e| SyncError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SyncError> {
        if self.auto_sync_interval_secs == 0 || self.auth_poll_interval_secs == 0 {
            return Err(SyncError::Config(
                "Sync and auth poll intervals must be positive".to_string(),
            ));
        }
        if self.snapshot_file_name.trim().is_empty() || self.folder_name.trim().is_empty() {
            return Err(SyncError::Config(
                "Folder and snapshot names must not be empty".to_string(),
            ));
        }
        if self.conflict_tolerance_secs < 0 {
            return Err(SyncError::Config(
                "Conflict tolerance must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.auto_sync_interval_secs)
    }

    pub fn auth_poll_interval(&self) -> Duration {
        Duration::from_secs(self.auth_poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn conflict_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.conflict_tolerance_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml("debounce_secs = 2\nfolder_name = \"Memos\"\n").unwrap();
        assert_eq!(config.debounce_secs, 2);
        assert_eq!(config.folder_name, "Memos");
        assert_eq!(config.conflict_tolerance_secs, 30);
        assert_eq!(config.auth_poll_interval_secs, 10);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = SyncConfig::from_toml("auto_sync_interval_secs = 0").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SyncConfig::default());
    }
}
