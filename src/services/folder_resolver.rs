use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{FolderInfo, FolderRef, FolderSelection};
use crate::services::remote_store::RemoteStore;
use crate::services::sync_service;
use crate::store::KvStore;
use std::sync::Arc;

/// Resolves the remote container that holds the snapshot object.
pub struct FolderResolver {
    remote: Arc<dyn RemoteStore>,
    store: Arc<dyn KvStore>,
    default_name: String,
    page_size: u32,
}

impl FolderResolver {
    pub fn new(remote: Arc<dyn RemoteStore>, store: Arc<dyn KvStore>, config: &SyncConfig) -> Self {
        Self {
            remote,
            store,
            default_name: config.folder_name.clone(),
            page_size: config.folder_page_size,
        }
    }

    /// Containers reachable by the principal, sorted by name
    pub async fn list_folders(&self) -> Result<Vec<FolderInfo>, SyncError> {
        self.remote.list_folders(self.page_size).await
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderInfo, SyncError> {
        let parent = match parent_id {
            Some(id) => FolderRef::Explicit(id.to_string()),
            None => FolderRef::Default,
        };
        self.remote.create_folder(name, &parent).await
    }

    /// Case-insensitive substring match over [`list_folders`](Self::list_folders)
    pub async fn search_folder(&self, needle: &str) -> Result<Vec<FolderInfo>, SyncError> {
        let needle = needle.trim().to_lowercase();
        let folders = self.list_folders().await?;
        Ok(folders
            .into_iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Explicit user choice; verified lazily on the next sync
    pub fn select_folder(&self, id: &str, name: &str) -> Result<(), SyncError> {
        let selection = FolderSelection::new(id.to_string(), name.to_string());
        sync_service::save_folder_selection(self.store.as_ref(), &selection)?;
        log::info!("Backup folder set to '{}' ({})", name, id);
        Ok(())
    }

    pub fn current_selection(&self) -> Result<Option<FolderSelection>, SyncError> {
        sync_service::load_folder_selection(self.store.as_ref())
    }

    fn adopt(&self, folder: &FolderInfo) -> Result<FolderRef, SyncError> {
        self.select_folder(&folder.id, &folder.name)?;
        Ok(FolderRef::from(folder))
    }

    /// Saved selection, else a folder with the default name, else a new one.
    ///
    /// Only a saved folder that is gone (not found or trashed) counts as
    /// stale and is forgotten; other errors on that lookup abort so the next
    /// cycle retries. Failures while searching or creating fall back to the
    /// default scope.
    pub async fn ensure_backup_folder(&self) -> Result<FolderRef, SyncError> {
        if let Some(selection) = self.current_selection()? {
            match self.remote.get_folder(&selection.folder_id).await? {
                Some(folder) => return Ok(FolderRef::from(&folder)),
                None => {
                    log::warn!(
                        "Saved backup folder '{}' ({}) is gone, resolving again",
                        selection.folder_name,
                        selection.folder_id
                    );
                    sync_service::clear_folder_selection(self.store.as_ref())?;
                }
            }
        }

        match self.remote.find_folders(&self.default_name).await {
            Ok(folders) => {
                if folders.len() > 1 {
                    log::warn!(
                        "{} folders named '{}', adopting the first",
                        folders.len(),
                        self.default_name
                    );
                }
                if let Some(folder) = folders.first() {
                    log::info!("Adopting existing backup folder {}", folder.id);
                    return self.adopt(folder);
                }
            }
            Err(SyncError::NotAuthenticated) => return Err(SyncError::NotAuthenticated),
            Err(e) => {
                log::warn!("Folder search failed, using default scope: {}", e);
                return Ok(FolderRef::Default);
            }
        }

        match self.remote.create_folder(&self.default_name, &FolderRef::Default).await {
            Ok(folder) => self.adopt(&folder),
            Err(SyncError::NotAuthenticated) => Err(SyncError::NotAuthenticated),
            Err(e) => {
                log::warn!("Folder creation failed, using default scope: {}", e);
                Ok(FolderRef::Default)
            }
        }
    }
}
