pub mod auth_monitor;
pub(crate) mod background_sync;
pub mod conflict_resolver;
pub mod device_identity;
pub mod drive_client;
pub mod export_import_service;
pub mod folder_resolver;
pub mod multipart;
pub mod remote_store;
pub mod snapshot_codec;
pub mod sync_engine;
pub mod sync_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth_monitor::AuthStateMonitor;
pub use drive_client::DriveClient;
pub use folder_resolver::FolderResolver;
pub use remote_store::{RemoteObject, RemoteStore, UploadRequest};
pub use sync_engine::{LogNotifier, SyncEngine, SyncNotifier};
