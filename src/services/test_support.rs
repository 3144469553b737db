//! In-memory [`RemoteStore`] for engine and resolver tests.

use crate::error::{RemoteStep, SyncError};
use crate::models::{FolderInfo, FolderRef};
use crate::services::remote_store::{RemoteObject, RemoteStore, UploadRequest};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    ListFolders,
    GetFolder(String),
    FindFolders(String),
    CreateFolder(String),
    Search { name: String, folder: FolderRef },
    Download(String),
    Create { name: String, folder: FolderRef },
    Update { id: String },
}

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub id: String,
    pub name: String,
    pub folder: FolderRef,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct FakeState {
    folders: Vec<FolderInfo>,
    files: Vec<FakeFile>,
    calls: Vec<RemoteCall>,
    next_id: u64,
    failing: Option<RemoteStep>,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Parks calls until released
#[derive(Default)]
struct Gate(Mutex<Option<Arc<Notify>>>);

impl Gate {
    fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.0.lock().unwrap() = Some(notify.clone());
        notify
    }

    fn release(&self) {
        if let Some(notify) = self.0.lock().unwrap().take() {
            notify.notify_waiters();
            notify.notify_one();
        }
    }

    async fn pass(&self) {
        let notify = self.0.lock().unwrap().clone();
        if let Some(notify) = notify {
            notify.notified().await;
        }
    }
}

pub struct FakeRemote {
    state: Mutex<FakeState>,
    authenticated: AtomicBool,
    search_gate: Gate,
    upload_gate: Gate,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            authenticated: AtomicBool::new(true),
            search_gate: Gate::default(),
            upload_gate: Gate::default(),
        }
    }

    pub fn set_authenticated(&self, value: bool) {
        self.authenticated.store(value, Ordering::SeqCst);
    }

    /// Makes every call of `step` answer with status 500
    pub fn fail_step(&self, step: Option<RemoteStep>) {
        self.state.lock().unwrap().failing = step;
    }

    /// Subsequent searches wait until the returned `Notify` is signalled
    pub fn hold_searches(&self) -> Arc<Notify> {
        self.search_gate.hold()
    }

    pub fn release_searches(&self) {
        self.search_gate.release();
    }

    /// Uploads are recorded, then wait for [`release_uploads`](Self::release_uploads)
    pub fn hold_uploads(&self) -> Arc<Notify> {
        self.upload_gate.hold()
    }

    pub fn release_uploads(&self) {
        self.upload_gate.release();
    }

    pub fn add_folder(&self, name: &str) -> FolderInfo {
        let mut state = self.state.lock().unwrap();
        let folder = FolderInfo {
            id: state.next_id("folder"),
            name: name.to_string(),
        };
        state.folders.push(folder.clone());
        folder
    }

    pub fn remove_folder(&self, id: &str) {
        self.state.lock().unwrap().folders.retain(|f| f.id != id);
    }

    pub fn put_file(&self, name: &str, folder: FolderRef, content: Vec<u8>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("file");
        state.files.push(FakeFile {
            id: id.clone(),
            name: name.to_string(),
            folder,
            content,
        });
        id
    }

    pub fn files_named(&self, name: &str) -> Vec<FakeFile> {
        self.state
            .lock()
            .unwrap()
            .files
            .iter()
            .filter(|f| f.name == name)
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&RemoteCall) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    fn begin(&self, step: RemoteStep, call: RemoteCall) -> Result<(), SyncError> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(SyncError::NotAuthenticated);
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing == Some(step) {
            return Err(SyncError::Remote {
                step,
                status: Some(500),
                message: "backend error".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_folders(&self, page_size: u32) -> Result<Vec<FolderInfo>, SyncError> {
        self.begin(RemoteStep::ListFolders, RemoteCall::ListFolders)?;
        let mut folders = self.state.lock().unwrap().folders.clone();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        folders.truncate(page_size as usize);
        Ok(folders)
    }

    async fn get_folder(&self, id: &str) -> Result<Option<FolderInfo>, SyncError> {
        self.begin(RemoteStep::GetFolder, RemoteCall::GetFolder(id.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state.folders.iter().find(|f| f.id == id).cloned())
    }

    async fn find_folders(&self, name: &str) -> Result<Vec<FolderInfo>, SyncError> {
        self.begin(RemoteStep::FindFolder, RemoteCall::FindFolders(name.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state.folders.iter().filter(|f| f.name == name).cloned().collect())
    }

    async fn create_folder(
        &self,
        name: &str,
        _parent: &FolderRef,
    ) -> Result<FolderInfo, SyncError> {
        self.begin(
            RemoteStep::CreateFolder,
            RemoteCall::CreateFolder(name.to_string()),
        )?;
        Ok(self.add_folder(name))
    }

    async fn search(
        &self,
        name: &str,
        folder: &FolderRef,
    ) -> Result<Vec<RemoteObject>, SyncError> {
        self.begin(
            RemoteStep::Search,
            RemoteCall::Search {
                name: name.to_string(),
                folder: folder.clone(),
            },
        )?;

        self.search_gate.pass().await;

        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .iter()
            .filter(|f| f.name == name && &f.folder == folder)
            .map(|f| RemoteObject {
                id: f.id.clone(),
                name: f.name.clone(),
                modified_time: None,
            })
            .collect())
    }

    async fn download(&self, object_id: &str) -> Result<Vec<u8>, SyncError> {
        self.begin(RemoteStep::Download, RemoteCall::Download(object_id.to_string()))?;
        let state = self.state.lock().unwrap();
        state
            .files
            .iter()
            .find(|f| f.id == object_id)
            .map(|f| f.content.clone())
            .ok_or_else(|| SyncError::Remote {
                step: RemoteStep::Download,
                status: Some(404),
                message: "not found".to_string(),
            })
    }

    async fn upload(&self, request: UploadRequest) -> Result<RemoteObject, SyncError> {
        let call = match &request.existing_id {
            Some(id) => RemoteCall::Update { id: id.clone() },
            None => RemoteCall::Create {
                name: request.name.clone(),
                folder: request.folder.clone(),
            },
        };
        self.begin(RemoteStep::Upload, call)?;
        self.upload_gate.pass().await;

        let mut state = self.state.lock().unwrap();
        let id = match request.existing_id {
            Some(id) => {
                let file = state
                    .files
                    .iter_mut()
                    .find(|f| f.id == id)
                    .ok_or_else(|| SyncError::Remote {
                        step: RemoteStep::Upload,
                        status: Some(404),
                        message: "not found".to_string(),
                    })?;
                file.content = request.content;
                id
            }
            None => {
                let id = state.next_id("file");
                state.files.push(FakeFile {
                    id: id.clone(),
                    name: request.name.clone(),
                    folder: request.folder,
                    content: request.content,
                });
                id
            }
        };

        Ok(RemoteObject {
            id,
            name: request.name,
            modified_time: Some(Utc::now()),
        })
    }
}
