use std::fmt;

/// Remote operation that produced a [`SyncError::Remote`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStep {
    Search,
    Download,
    Upload,
    ListFolders,
    GetFolder,
    FindFolder,
    CreateFolder,
}

impl fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RemoteStep::Search => "search",
            RemoteStep::Download => "download",
            RemoteStep::Upload => "upload",
            RemoteStep::ListFolders => "list folders",
            RemoteStep::GetFolder => "get folder",
            RemoteStep::FindFolder => "find folder",
            RemoteStep::CreateFolder => "create folder",
        };
        f.write_str(name)
    }
}

/// Failures of the persisted key-value store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing storage itself failed (open, query, lock)
    #[error("Store backend error: {0}")]
    Backend(String),
    /// A single write was refused
    #[error("Write of '{key}' rejected: {reason}")]
    Rejected { key: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Central error type of the sync engine
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No usable credential; automatic cycles abort silently on this
    #[error("Not authenticated with the remote store")]
    NotAuthenticated,
    /// Non-success answer (or transport failure) from the remote store
    #[error("Remote {step} failed{}: {message}", .status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Remote {
        step: RemoteStep,
        status: Option<u16>,
        message: String,
    },
    /// Remote snapshot bytes could not be decoded
    #[error("Snapshot decode error: {0}")]
    Decode(String),
    /// A single key could not be persisted while applying a snapshot
    #[error("Failed to write '{key}': {message}")]
    LocalWrite { key: String, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Token verification against the auth endpoint failed
    #[error(transparent)]
    Auth(#[from] drive_auth::AuthError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    pub(crate) fn remote(step: RemoteStep, status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Remote {
            step,
            status,
            message: message.into(),
        }
    }

    /// Whether this error is the expected "signed out" steady state
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, SyncError::NotAuthenticated)
    }
}

/// User-friendly error messages for notifications
impl SyncError {
    pub fn user_message(&self) -> String {
        match self {
            SyncError::NotAuthenticated => {
                "Please sign in to Google Drive to enable sync.".to_string()
            }
            SyncError::Remote { step, message, .. } => {
                format!("Cloud sync failed during {}: {}", step, message)
            }
            SyncError::Decode(_) => {
                "The cloud backup could not be read and will be replaced.".to_string()
            }
            SyncError::LocalWrite { key, .. } => format!("Could not save '{}' locally.", key),
            SyncError::Store(_) => "Local storage is unavailable. Please try again.".to_string(),
            SyncError::Auth(drive_auth::AuthError::InvalidToken) => {
                "The Google Drive token was rejected. Please sign in again.".to_string()
            }
            SyncError::Auth(_) => "Could not verify the Google Drive sign-in.".to_string(),
            SyncError::Config(msg) => msg.clone(),
            SyncError::Io(_) => "Error accessing files. Please check permissions.".to_string(),
            SyncError::Serialization(_) => "Sync data could not be prepared.".to_string(),
        }
    }
}
