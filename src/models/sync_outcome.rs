use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decision of the conflict resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    None,
    Upload,
    Download,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncAction::None => write!(f, "none"),
            SyncAction::Upload => write!(f, "upload"),
            SyncAction::Download => write!(f, "download"),
        }
    }
}

/// Result of one synchronization attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub action: SyncAction,
    pub updated_keys: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// What started a sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Manual,
    Timer,
    DataChanged,
    FocusRegained,
    AuthRestored,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::Timer => "timer",
            SyncTrigger::DataChanged => "data-changed",
            SyncTrigger::FocusRegained => "focus",
            SyncTrigger::AuthRestored => "auth-restored",
        };
        f.write_str(name)
    }
}

/// Snapshot of the engine state for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_authenticated: bool,
    pub is_auto_sync_running: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub device_id: String,
}

/// In-memory session log entry (volatile, lost on restart)
#[derive(Debug, Clone, PartialEq)]
pub struct SyncLogEntry {
    pub at: DateTime<Utc>,
    pub trigger: SyncTrigger,
    pub action: SyncAction,
    pub updated_keys: usize,
}
