use crate::error::SyncError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Version of the snapshot document written by this engine
pub const FORMAT_VERSION: u32 = 1;

/// Snapshot of the allow-listed local data, rebuilt on every sync attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSnapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub device_id: String,
    pub entries: BTreeMap<String, Value>,
}

/// Who wrote the remote snapshot, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInfo {
    pub device_id: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

/// Snapshot as stored in the remote object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSnapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub device_id: String,
    pub entries: BTreeMap<String, Value>,
    pub sync_info: SyncInfo,
}

impl RemoteSnapshot {
    /// Wraps a local snapshot for upload; `lastModified` is the local timestamp
    pub fn from_local(local: &LocalSnapshot, folder_id: Option<String>) -> Self {
        Self {
            format_version: local.format_version,
            created_at: local.created_at,
            device_id: local.device_id.clone(),
            entries: local.entries.clone(),
            sync_info: SyncInfo {
                device_id: local.device_id.clone(),
                last_modified: local.created_at,
                folder_id,
            },
        }
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.sync_info.last_modified
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format_is_camel_case() {
        let local = LocalSnapshot {
            format_version: FORMAT_VERSION,
            created_at: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            device_id: "device_abc123def_1740000000000".to_string(),
            entries: BTreeMap::from([("memos".to_string(), json!([{"id": 1}]))]),
        };
        let remote = RemoteSnapshot::from_local(&local, Some("folder-1".to_string()));

        let value: Value = serde_json::from_slice(&remote.to_bytes().unwrap()).unwrap();
        assert_eq!(value["formatVersion"], json!(1));
        assert_eq!(value["syncInfo"]["folderId"], json!("folder-1"));
        assert_eq!(value["syncInfo"]["lastModified"], value["createdAt"]);
        assert_eq!(value["entries"]["memos"], json!([{"id": 1}]));
    }

    #[test]
    fn test_missing_sync_info_is_decode_error() {
        let bytes = br#"{"formatVersion":1,"createdAt":"2025-03-01T10:00:00Z","deviceId":"d","entries":{}}"#;
        let err = RemoteSnapshot::from_bytes(bytes).unwrap_err();
        assert!(matches!(err, SyncError::Decode(_)));
    }
}
