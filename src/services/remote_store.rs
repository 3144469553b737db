use crate::error::SyncError;
use crate::models::{FolderInfo, FolderRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An object (file) in the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    pub modified_time: Option<DateTime<Utc>>,
}

/// Content write request.
///
/// With `existing_id` the object is updated in place and never reparented;
/// without it a new object is created inside `folder`.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub folder: FolderRef,
    pub existing_id: Option<String>,
    pub content: Vec<u8>,
}

impl UploadRequest {
    pub fn is_update(&self) -> bool {
        self.existing_id.is_some()
    }
}

/// Operations the engine needs from the remote object store.
///
/// Every call needs a usable credential and fails with
/// [`SyncError::NotAuthenticated`] otherwise; non-success answers surface as
/// [`SyncError::Remote`]. Nothing is retried inside a call.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Containers reachable by the principal, sorted by name
    async fn list_folders(&self, page_size: u32) -> Result<Vec<FolderInfo>, SyncError>;

    /// `None` when the container no longer exists (or is trashed)
    async fn get_folder(&self, id: &str) -> Result<Option<FolderInfo>, SyncError>;

    /// Containers named exactly `name`, wherever they live
    async fn find_folders(&self, name: &str) -> Result<Vec<FolderInfo>, SyncError>;

    async fn create_folder(&self, name: &str, parent: &FolderRef)
        -> Result<FolderInfo, SyncError>;

    /// Objects named exactly `name` inside `folder`
    async fn search(&self, name: &str, folder: &FolderRef)
        -> Result<Vec<RemoteObject>, SyncError>;

    async fn download(&self, object_id: &str) -> Result<Vec<u8>, SyncError>;

    async fn upload(&self, request: UploadRequest) -> Result<RemoteObject, SyncError>;
}
