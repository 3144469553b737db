//! Snapshot synchronization of memo data with Google Drive.
//!
//! The host owns a [`KvStore`]; a [`SyncEngine`] keeps the allow-listed keys
//! of that store in agreement with a single JSON object in a Drive folder.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use config::SyncConfig;
pub use error::{RemoteStep, StoreError, SyncError};
pub use services::{DriveClient, LogNotifier, SyncEngine, SyncNotifier};
pub use store::{KvStore, MemoryStore};
