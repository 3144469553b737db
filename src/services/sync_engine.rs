//! The sync orchestrator.
//!
//! One [`SyncEngine`] is built by the host and cloned into whatever needs
//! sync control. A cycle resolves the folder, fetches the remote snapshot,
//! compares it with a freshly built local one and executes the decision.
//! At most one cycle runs at a time; triggers arriving meanwhile are dropped.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::keys::is_backup_key;
use crate::models::{
    FolderInfo, FolderRef, FolderSelection, RemoteSnapshot, SyncAction, SyncLogEntry, SyncOutcome,
    SyncStatus, SyncTrigger,
};
use crate::services::auth_monitor::AuthStateMonitor;
use crate::services::background_sync::Scheduler;
use crate::services::folder_resolver::FolderResolver;
use crate::services::remote_store::{RemoteStore, UploadRequest};
use crate::services::snapshot_codec::ApplyReport;
use crate::services::{
    conflict_resolver, device_identity, export_import_service, snapshot_codec, sync_service,
};
use crate::store::KvStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Receives the user-facing result of sync cycles
pub trait SyncNotifier: Send + Sync {
    fn on_sync_completed(&self, outcome: &SyncOutcome);
    fn on_sync_failed(&self, message: &str);
}

/// Notifier that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SyncNotifier for LogNotifier {
    fn on_sync_completed(&self, outcome: &SyncOutcome) {
        log::info!(
            "Sync completed: {} ({} keys)",
            outcome.action,
            outcome.updated_keys.len()
        );
    }

    fn on_sync_failed(&self, message: &str) {
        log::error!("Sync failed: {}", message);
    }
}

/// Holds the single-flight flag for the duration of one cycle
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightGuard(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct EngineInner {
    config: SyncConfig,
    store: Arc<dyn KvStore>,
    remote: Arc<dyn RemoteStore>,
    auth: AuthStateMonitor,
    folders: FolderResolver,
    device_id: String,
    notifier: Arc<dyn SyncNotifier>,
    syncing: AtomicBool,
    history: Mutex<Vec<SyncLogEntry>>,
    scheduler: Scheduler,
}

#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

/// Engine handle that does not keep the engine alive
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

impl WeakEngine {
    pub fn upgrade(&self) -> Option<SyncEngine> {
        self.0.upgrade().map(|inner| SyncEngine { inner })
    }
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn KvStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self, SyncError> {
        Self::with_notifier(config, store, remote, Arc::new(LogNotifier))
    }

    /// Builds the engine; the device identity is created here if missing
    pub fn with_notifier(
        config: SyncConfig,
        store: Arc<dyn KvStore>,
        remote: Arc<dyn RemoteStore>,
        notifier: Arc<dyn SyncNotifier>,
    ) -> Result<Self, SyncError> {
        let device_id = device_identity::get_or_create_device_id(store.as_ref())?;
        let folders = FolderResolver::new(remote.clone(), store.clone(), &config);
        let auth = AuthStateMonitor::new(store.clone());

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                remote,
                auth,
                folders,
                device_id,
                notifier,
                syncing: AtomicBool::new(false),
                history: Mutex::new(Vec::new()),
                scheduler: Scheduler::default(),
            }),
        })
    }

    pub(crate) fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.inner))
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    pub fn is_auto_sync_enabled(&self) -> bool {
        sync_service::is_auto_sync_enabled(self.inner.store.as_ref()).unwrap_or_else(|e| {
            log::warn!("Could not read auto-sync flag: {}", e);
            false
        })
    }

    /// Starts watching the credential; arming and the first sync follow from it
    pub fn start(&self) {
        if self.inner.scheduler.start(self) {
            log::info!("Sync engine started for device {}", self.inner.device_id);
        } else {
            log::warn!("Sync engine already running");
        }
    }

    /// Stops every background task; a cycle in flight is left to finish
    pub fn shutdown(&self) {
        self.inner.scheduler.shutdown();
        log::info!("Sync engine stopped");
    }

    /// Runs one cycle now, regardless of the auto-sync flag.
    ///
    /// `Ok(None)` means another cycle was already running.
    pub async fn manual_sync(&self) -> Result<Option<SyncOutcome>, SyncError> {
        self.sync_once(SyncTrigger::Manual).await
    }

    pub fn get_sync_status(&self) -> SyncStatus {
        let last_sync_time = sync_service::last_sync_time(self.inner.store.as_ref())
            .unwrap_or_else(|e| {
                log::warn!("Could not read last sync time: {}", e);
                None
            });

        SyncStatus {
            is_authenticated: self.is_authenticated(),
            is_auto_sync_running: self.inner.scheduler.is_timer_armed(),
            last_sync_time,
            device_id: self.inner.device_id.clone(),
        }
    }

    /// Persists the flag and arms or disarms the timer to match
    pub fn toggle_auto_sync(&self, enabled: bool) -> Result<(), SyncError> {
        sync_service::set_auto_sync_enabled(self.inner.store.as_ref(), enabled)?;
        let scheduler = &self.inner.scheduler;

        if !enabled {
            scheduler.disarm_timer();
            scheduler.cancel_debounce();
        } else if scheduler.is_monitoring() && self.is_authenticated() {
            scheduler.arm_timer(self);
        }
        log::info!("Auto-sync {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Records a local write; allow-listed keys schedule a debounced sync
    pub fn notify_data_changed(&self, key: &str) -> Result<(), SyncError> {
        if !is_backup_key(key) {
            return Ok(());
        }
        sync_service::record_local_change(
            self.inner.store.as_ref(),
            Utc::now(),
            self.inner.config.conflict_tolerance(),
        )?;
        log::debug!("Local change to {}, sync in {}s", key, self.inner.config.debounce_secs);
        self.inner.scheduler.schedule_debounced(self);
        Ok(())
    }

    /// Opportunistic sync when the host regains input focus
    pub fn on_focus_regained(&self) {
        self.spawn_cycle(SyncTrigger::FocusRegained);
    }

    pub async fn list_folders(&self) -> Result<Vec<FolderInfo>, SyncError> {
        self.inner.folders.list_folders().await
    }

    pub async fn search_folders(&self, needle: &str) -> Result<Vec<FolderInfo>, SyncError> {
        self.inner.folders.search_folder(needle).await
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderInfo, SyncError> {
        self.inner.folders.create_folder(name, parent_id).await
    }

    pub fn select_folder(&self, id: &str, name: &str) -> Result<(), SyncError> {
        self.inner.folders.select_folder(id, name)
    }

    pub fn folder_selection(&self) -> Result<Option<FolderSelection>, SyncError> {
        self.inner.folders.current_selection()
    }

    /// Writes a local backup file into `dir`
    pub fn export_backup(&self, dir: &Path) -> Result<PathBuf, SyncError> {
        export_import_service::export_backup(self.inner.store.as_ref(), &self.inner.device_id, dir)
    }

    /// Restores a backup file and schedules a sync of the restored data
    pub fn import_backup(&self, file: &Path) -> Result<ApplyReport, SyncError> {
        let report = export_import_service::import_backup(
            self.inner.store.as_ref(),
            file,
            self.inner.config.conflict_tolerance(),
        )?;
        if !report.written.is_empty() {
            self.inner.scheduler.schedule_debounced(self);
        }
        Ok(report)
    }

    /// Entries of this session, oldest first
    pub fn sync_log(&self) -> Vec<SyncLogEntry> {
        self.inner
            .history
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn next_sync_eta_seconds(&self) -> Option<u64> {
        self.inner.scheduler.next_sync_eta_seconds()
    }

    /// Runs an automatic cycle on its own task
    pub(crate) fn spawn_cycle(&self, trigger: SyncTrigger) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_triggered(trigger).await;
        });
    }

    /// Automatic cycle: gated on the auto-sync flag and the credential
    async fn run_triggered(&self, trigger: SyncTrigger) -> Option<SyncOutcome> {
        if !self.is_auto_sync_enabled() || !self.is_authenticated() {
            log::debug!("Skipping {} sync: auto-sync off or signed out", trigger);
            return None;
        }
        match self.sync_once(trigger).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_not_authenticated() => {
                log::debug!("{} sync aborted: {}", trigger, e);
                None
            }
            Err(_) => None,
        }
    }

    /// Single-flight wrapper around [`perform_cycle`](Self::perform_cycle)
    async fn sync_once(&self, trigger: SyncTrigger) -> Result<Option<SyncOutcome>, SyncError> {
        let Some(_guard) = FlightGuard::acquire(&self.inner.syncing) else {
            log::debug!("Sync already in progress, dropping {} trigger", trigger);
            return Ok(None);
        };

        log::info!("Starting {} sync", trigger);
        match self.perform_cycle().await {
            Ok(outcome) => {
                log::info!(
                    "{} sync finished: {} ({} keys)",
                    trigger,
                    outcome.action,
                    outcome.updated_keys.len()
                );
                self.record(trigger, &outcome);
                if outcome.action != SyncAction::None {
                    self.inner.notifier.on_sync_completed(&outcome);
                }
                Ok(Some(outcome))
            }
            Err(e) => {
                if !e.is_not_authenticated() {
                    log::error!("{} sync failed: {}", trigger, e);
                    self.inner.notifier.on_sync_failed(&e.user_message());
                }
                Err(e)
            }
        }
    }

    fn record(&self, trigger: SyncTrigger, outcome: &SyncOutcome) {
        let limit = self.inner.config.history_limit;
        if let Ok(mut history) = self.inner.history.lock() {
            history.push(SyncLogEntry {
                at: outcome.timestamp,
                trigger,
                action: outcome.action,
                updated_keys: outcome.updated_keys.len(),
            });
            if history.len() > limit {
                let excess = history.len() - limit;
                history.drain(0..excess);
            }
        }
    }

    async fn perform_cycle(&self) -> Result<SyncOutcome, SyncError> {
        let inner = &self.inner;
        let store = inner.store.as_ref();
        let name = inner.config.snapshot_file_name.as_str();

        let folder = inner.folders.ensure_backup_folder().await?;

        let found = inner.remote.search(name, &folder).await?;
        if found.len() > 1 {
            log::warn!("{} objects named {} in folder, using the first", found.len(), name);
        }
        let existing = found.into_iter().next();

        let remote = match &existing {
            Some(object) => {
                let bytes = inner.remote.download(&object.id).await?;
                match RemoteSnapshot::from_bytes(&bytes) {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        log::warn!("Remote snapshot unusable, will overwrite: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let tolerance = inner.config.conflict_tolerance();
        let seen = sync_service::local_change_watermark(store)?;
        let local = snapshot_codec::build_local_snapshot(store, &inner.device_id);
        let mut outcome = conflict_resolver::resolve(&local, remote.as_ref(), tolerance);

        match (outcome.action, remote.as_ref()) {
            (SyncAction::Upload, _) => {
                let document = RemoteSnapshot::from_local(&local, folder_id(&folder));
                let request = UploadRequest {
                    name: name.to_string(),
                    folder: folder.clone(),
                    existing_id: existing.map(|object| object.id),
                    content: document.to_bytes()?,
                };
                let uploaded = inner.remote.upload(request).await?;
                log::debug!("Snapshot stored as {}", uploaded.id);
                sync_service::settle_local_change_watermark(
                    store,
                    seen,
                    local.created_at,
                    tolerance,
                )?;
            }
            (SyncAction::Download, Some(remote)) => {
                let report = snapshot_codec::apply_remote_snapshot(store, remote);
                for failure in &report.failed {
                    log::warn!("{}", failure);
                }
                sync_service::settle_local_change_watermark(
                    store,
                    seen,
                    remote.last_modified(),
                    tolerance,
                )?;
                outcome.updated_keys = report.written;
            }
            (SyncAction::Download, None) | (SyncAction::None, _) => {}
        }

        sync_service::update_last_sync(store, Utc::now())?;
        Ok(outcome)
    }
}

fn folder_id(folder: &FolderRef) -> Option<String> {
    folder.id().map(str::to_string)
}
