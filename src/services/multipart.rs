//! `multipart/related` framing for Drive uploads.
//!
//! One JSON metadata part followed by one JSON content part, each preceded
//! by the shared boundary and closed by the terminal marker.

use serde_json::Value;

/// A framed request body with its boundary
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }
}

/// Fresh boundary token that cannot collide with JSON content
pub fn new_boundary() -> String {
    format!("memo_sync_{}", uuid::Uuid::new_v4().simple())
}

/// Metadata part: `name`, plus `parents` only when creating
pub fn upload_metadata(name: &str, parent: Option<&str>, is_update: bool) -> Value {
    let mut metadata = serde_json::json!({
        "name": name,
        "mimeType": "application/json",
    });
    if !is_update {
        if let Some(parent) = parent {
            metadata["parents"] = serde_json::json!([parent]);
        }
    }
    metadata
}

pub fn build_related(metadata: &Value, content: &[u8], boundary: &str) -> MultipartBody {
    let delimiter = format!("\r\n--{}\r\n", boundary);
    let close_delimiter = format!("\r\n--{}--", boundary);

    let mut body = Vec::with_capacity(content.len() + 512);
    body.extend_from_slice(delimiter.as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(delimiter.as_bytes());
    body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(close_delimiter.as_bytes());

    MultipartBody {
        boundary: boundary.to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Splits a body into its part payloads (headers stripped)
    fn parts(body: &MultipartBody) -> Vec<String> {
        let text = String::from_utf8(body.body.clone()).unwrap();
        let delimiter = format!("--{}", body.boundary);
        let terminal = format!("--{}--", body.boundary);
        assert!(text.ends_with(&terminal));

        text.trim_end_matches(terminal.as_str())
            .split(delimiter.as_str())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (_, payload) = part.split_once("\r\n\r\n").unwrap();
                payload.trim().to_string()
            })
            .collect()
    }

    #[test]
    fn test_two_parts_with_shared_boundary() {
        let metadata = upload_metadata("memo-calendar-autosync.json", Some("folder-1"), false);
        let content = br#"{"entries":{"memos":[{"id":1}]}}"#;
        let body = build_related(&metadata, content, "b0undary");

        let text = String::from_utf8(body.body.clone()).unwrap();
        assert_eq!(text.matches("--b0undary\r\n").count(), 2);
        assert_eq!(text.matches("--b0undary--").count(), 1);
        assert_eq!(body.content_type(), "multipart/related; boundary=b0undary");

        let parts = parts(&body);
        assert_eq!(parts.len(), 2);
        let meta: Value = serde_json::from_str(&parts[0]).unwrap();
        assert_eq!(meta["parents"], json!(["folder-1"]));
        let payload: Value = serde_json::from_str(&parts[1]).unwrap();
        assert_eq!(payload["entries"]["memos"], json!([{"id": 1}]));
    }

    #[test]
    fn test_update_metadata_omits_parents() {
        let metadata = upload_metadata("memo-calendar-autosync.json", Some("folder-1"), true);
        assert!(metadata.get("parents").is_none());
        assert_eq!(metadata["name"], json!("memo-calendar-autosync.json"));
    }

    #[test]
    fn test_create_in_default_scope_has_no_parents() {
        let metadata = upload_metadata("memo-calendar-autosync.json", None, false);
        assert!(metadata.get("parents").is_none());
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(new_boundary(), new_boundary());
    }
}
