//! Request/response bodies of the screening backend

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a successful `/upload-multi` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadResponse {
    /// Number of stored files as reported by the backend
    #[serde(default)]
    pub count: Option<usize>,
    /// Stored files; `null` or missing means none
    #[serde(default)]
    pub files: Option<Vec<UploadedFile>>,
}

impl UploadResponse {
    /// Resolve every stored file's URL against `api_base`, keeping order
    pub fn into_items(self, api_base: &str) -> Vec<UploadResultItem> {
        self.files
            .unwrap_or_default()
            .into_iter()
            .map(|file| file.resolve(api_base))
            .collect()
    }
}

/// One stored file as returned by the backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadedFile {
    /// Server-assigned URL, relative or absolute
    pub url: String,
    /// Every other field (`filename`, `resized`, ...)
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl UploadedFile {
    pub fn resolve(self, api_base: &str) -> UploadResultItem {
        UploadResultItem {
            url: super::resolve_url(api_base, &self.url),
            metadata: self.metadata,
        }
    }
}

/// Upload result handed to the completion callback
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResultItem {
    /// Absolute URL of the stored image
    pub url: String,
    pub metadata: Map<String, Value>,
}

impl UploadResultItem {
    /// String metadata field, e.g. `filename` or `resized`
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Body of a `/check-brightness` response
///
/// Only the status is part of the contract; the fields are read when present.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BrightnessCheckResponse {
    #[serde(default)]
    pub filename: Option<String>,
    /// Mean luminance of the image
    #[serde(default)]
    pub brightness: Option<f64>,
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub saved_to: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_resolves_urls_in_order() {
        let response: UploadResponse = serde_json::from_str(
            r#"{"count": 2, "files": [
                {"url": "/a.jpg", "filename": "a.jpg", "resized": "/images/resized/a.jpg"},
                {"url": "http://x/b.jpg"}
            ]}"#,
        )
        .unwrap();

        let items = response.into_items("http://localhost:8000");
        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(urls, vec!["http://localhost:8000/a.jpg", "http://x/b.jpg"]);
        assert_eq!(items[0].meta_str("filename"), Some("a.jpg"));
        assert_eq!(items[0].meta_str("resized"), Some("/images/resized/a.jpg"));
        assert!(items[1].metadata.is_empty());
    }

    #[test]
    fn test_missing_or_null_files_is_empty() {
        let missing: UploadResponse = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(missing.into_items("http://h").is_empty());

        let null: UploadResponse = serde_json::from_str(r#"{"files": null}"#).unwrap();
        assert!(null.into_items("http://h").is_empty());
    }

    #[test]
    fn test_file_without_url_is_rejected() {
        let result = serde_json::from_str::<UploadResponse>(r#"{"files": [{"filename": "a"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_brightness_response_tolerates_partial_body() {
        let response: BrightnessCheckResponse =
            serde_json::from_str(r#"{"passed": false, "brightness": 31.5}"#).unwrap();
        assert_eq!(response.passed, Some(false));
        assert_eq!(response.brightness, Some(31.5));
        assert!(response.filename.is_none());
    }
}
