pub mod folder;
pub mod keys;
pub mod snapshot;
pub mod sync_outcome;

pub use folder::{FolderInfo, FolderRef, FolderSelection, FOLDER_MIME_TYPE};
pub use snapshot::{LocalSnapshot, RemoteSnapshot, SyncInfo, FORMAT_VERSION};
pub use sync_outcome::{SyncAction, SyncLogEntry, SyncOutcome, SyncStatus, SyncTrigger};
