//! Google Drive v3 implementation of [`RemoteStore`].

use crate::config::SyncConfig;
use crate::error::{RemoteStep, SyncError};
use crate::models::{FolderInfo, FolderRef, FOLDER_MIME_TYPE};
use crate::services::auth_monitor::AuthStateMonitor;
use crate::services::multipart::{self, MultipartBody};
use crate::services::remote_store::{RemoteObject, RemoteStore, UploadRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

/// Scope searched and created in when no folder is configured
const ROOT_SCOPE: &str = "root";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    trashed: bool,
    #[serde(default)]
    modified_time: Option<DateTime<Utc>>,
}

impl From<DriveFile> for RemoteObject {
    fn from(file: DriveFile) -> Self {
        RemoteObject {
            id: file.id,
            name: file.name,
            modified_time: file.modified_time,
        }
    }
}

impl From<DriveFile> for FolderInfo {
    fn from(file: DriveFile) -> Self {
        FolderInfo {
            id: file.id,
            name: file.name,
        }
    }
}

/// Drive query string literal escaping
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Method, URL and body of a content upload, before auth is attached
#[derive(Debug)]
struct PreparedUpload {
    method: Method,
    url: String,
    body: MultipartBody,
}

/// Drive REST client; reads the access token on every call
pub struct DriveClient {
    http: reqwest::Client,
    auth: AuthStateMonitor,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(config: &SyncConfig, auth: AuthStateMonitor) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent("MemoSync/0.1.0")
            .build()
            .map_err(|e| SyncError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            auth,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base: config.upload_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.api_base)
    }

    /// Attaches the bearer token and sends; transport failures map to `step`
    async fn execute(&self, step: RemoteStep, request: RequestBuilder) -> Result<Response, SyncError> {
        let token = self.auth.access_token()?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SyncError::remote(step, None, e.to_string()))
    }

    /// Turns any non-2xx answer into a `RemoteError` carrying the body text
    async fn check(step: RemoteStep, response: Response) -> Result<Response, SyncError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        log::error!("Drive {} failed with {}: {}", step, status, message);
        Err(SyncError::remote(step, Some(status.as_u16()), message))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        step: RemoteStep,
        response: Response,
    ) -> Result<T, SyncError> {
        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::remote(step, None, format!("Invalid response: {}", e)))
    }

    fn prepare_upload(&self, request: &UploadRequest) -> PreparedUpload {
        let metadata = multipart::upload_metadata(
            &request.name,
            Some(request.folder.id().unwrap_or(ROOT_SCOPE)),
            request.is_update(),
        );
        let body = multipart::build_related(&metadata, &request.content, &multipart::new_boundary());

        match &request.existing_id {
            Some(id) => PreparedUpload {
                method: Method::PATCH,
                url: format!(
                    "{}/upload/drive/v3/files/{}?uploadType=multipart&fields=id,name,modifiedTime",
                    self.upload_base, id
                ),
                body,
            },
            None => PreparedUpload {
                method: Method::POST,
                url: format!(
                    "{}/upload/drive/v3/files?uploadType=multipart&fields=id,name,modifiedTime",
                    self.upload_base
                ),
                body,
            },
        }
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_folders(&self, page_size: u32) -> Result<Vec<FolderInfo>, SyncError> {
        let step = RemoteStep::ListFolders;
        let query = format!("mimeType='{}' and trashed=false", FOLDER_MIME_TYPE);
        let page_size_param = page_size.to_string();
        let request = self.http.get(self.files_url()).query(&[
            ("q", query.as_str()),
            ("orderBy", "name"),
            ("pageSize", page_size_param.as_str()),
            ("fields", "files(id,name)"),
            ("spaces", "drive"),
        ]);

        let response = Self::check(step, self.execute(step, request).await?).await?;
        let list: FileList = Self::json(step, response).await?;

        let mut folders: Vec<FolderInfo> = list.files.into_iter().map(FolderInfo::from).collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        folders.truncate(page_size as usize);
        log::debug!("Listed {} Drive folders", folders.len());
        Ok(folders)
    }

    async fn get_folder(&self, id: &str) -> Result<Option<FolderInfo>, SyncError> {
        let step = RemoteStep::GetFolder;
        let request = self
            .http
            .get(format!("{}/{}", self.files_url(), id))
            .query(&[("fields", "id,name,mimeType,trashed")]);

        let response = self.execute(step, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let file: DriveFile = Self::json(step, Self::check(step, response).await?).await?;

        let is_folder = file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE);
        if file.trashed || !is_folder {
            return Ok(None);
        }
        Ok(Some(file.into()))
    }

    async fn find_folders(&self, name: &str) -> Result<Vec<FolderInfo>, SyncError> {
        let step = RemoteStep::FindFolder;
        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query(name),
            FOLDER_MIME_TYPE
        );
        let request = self.http.get(self.files_url()).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("spaces", "drive"),
        ]);

        let response = Self::check(step, self.execute(step, request).await?).await?;
        let list: FileList = Self::json(step, response).await?;
        Ok(list.files.into_iter().map(FolderInfo::from).collect())
    }

    async fn create_folder(
        &self,
        name: &str,
        parent: &FolderRef,
    ) -> Result<FolderInfo, SyncError> {
        let step = RemoteStep::CreateFolder;
        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent_id) = parent.id() {
            metadata["parents"] = serde_json::json!([parent_id]);
        }

        let request = self
            .http
            .post(self.files_url())
            .query(&[("fields", "id,name")])
            .json(&metadata);

        let response = Self::check(step, self.execute(step, request).await?).await?;
        let file: DriveFile = Self::json(step, response).await?;
        log::info!("Created Drive folder '{}' ({})", file.name, file.id);
        Ok(file.into())
    }

    async fn search(
        &self,
        name: &str,
        folder: &FolderRef,
    ) -> Result<Vec<RemoteObject>, SyncError> {
        let step = RemoteStep::Search;
        let query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query(name),
            escape_query(folder.id().unwrap_or(ROOT_SCOPE))
        );
        let request = self.http.get(self.files_url()).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name,modifiedTime)"),
            ("spaces", "drive"),
        ]);

        let response = Self::check(step, self.execute(step, request).await?).await?;
        let list: FileList = Self::json(step, response).await?;
        Ok(list.files.into_iter().map(RemoteObject::from).collect())
    }

    async fn download(&self, object_id: &str) -> Result<Vec<u8>, SyncError> {
        let step = RemoteStep::Download;
        let request = self
            .http
            .get(format!("{}/{}", self.files_url(), object_id))
            .query(&[("alt", "media")]);

        let response = Self::check(step, self.execute(step, request).await?).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::remote(step, None, format!("Read response failed: {}", e)))?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, request: UploadRequest) -> Result<RemoteObject, SyncError> {
        let step = RemoteStep::Upload;
        let prepared = self.prepare_upload(&request);
        let content_type = prepared.body.content_type();

        let http_request = self
            .http
            .request(prepared.method, prepared.url)
            .header(header::CONTENT_TYPE, content_type)
            .body(prepared.body.body);

        let response = Self::check(step, self.execute(step, http_request).await?).await?;
        let file: DriveFile = Self::json(step, response).await?;
        log::info!(
            "{} Drive object '{}' ({})",
            if request.is_update() { "Updated" } else { "Created" },
            file.name,
            file.id
        );
        Ok(file.into())
    }
}
