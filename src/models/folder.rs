use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A remote container as listed by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
}

/// Where snapshot objects are placed and searched for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderRef {
    /// The store's implicit scope (no folder configured or resolvable)
    Default,
    /// A concrete container id
    Explicit(String),
}

impl FolderRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            FolderRef::Default => None,
            FolderRef::Explicit(id) => Some(id),
        }
    }
}

impl From<&FolderInfo> for FolderRef {
    fn from(folder: &FolderInfo) -> Self {
        FolderRef::Explicit(folder.id.clone())
    }
}

/// Persisted choice of backup folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSelection {
    pub folder_id: String,
    pub folder_name: String,
    pub saved_at: DateTime<Utc>,
}

impl FolderSelection {
    pub fn new(folder_id: String, folder_name: String) -> Self {
        Self {
            folder_id,
            folder_name,
            saved_at: Utc::now(),
        }
    }
}
