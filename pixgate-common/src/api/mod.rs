//! Backend REST contract: endpoint paths, wire types and URL resolution

pub mod types;

pub use types::{BrightnessCheckResponse, UploadResponse, UploadResultItem, UploadedFile};

/// Listing of uploaded originals, oldest first
pub const LIST_PATH: &str = "/list";
/// Batch upload, one multipart part per file
pub const UPLOAD_MULTI_PATH: &str = "/upload-multi";
/// Single-image brightness classification
pub const CHECK_BRIGHTNESS_PATH: &str = "/check-brightness";
/// Brightness-pass listing with absolute-suffix paths
pub const BRIGHTNESS_PASS_PATH: &str = "/brightness-pass";
/// Brightness-fail listing with absolute-suffix paths
pub const BRIGHTNESS_FAIL_PATH: &str = "/brightness-fail";
/// Post-processing output directory of passing images
pub const IMAGES_BRIGHTNESS_PASS_PATH: &str = "/images/brightness_pass";
/// Post-processing output directory of failing images
pub const IMAGES_BRIGHTNESS_FAIL_PATH: &str = "/images/brightness_fail";
/// Resized copies of every upload
pub const IMAGES_RESIZED_PATH: &str = "/images/resized";

/// Multipart field name shared by every part of a batch upload
pub const UPLOAD_FIELD: &str = "files";
/// Multipart field name of the single brightness-check part
pub const CHECK_FIELD: &str = "file";

/// True when `path` already carries an http(s) scheme
pub fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Resolve a backend-returned path against the API base
///
/// Absolute URLs pass through unchanged; anything else is appended to the base.
pub fn resolve_url(api_base: &str, path: &str) -> String {
    if is_absolute_url(path) {
        path.to_string()
    } else {
        format!("{}{}", api_base.trim_end_matches('/'), path)
    }
}

/// Resolve a path returned by a directory listing endpoint
///
/// Bare file names are relative to `directory`; rooted paths and absolute URLs
/// behave as in [`resolve_url`].
pub fn resolve_in_directory(api_base: &str, directory: &str, path: &str) -> String {
    if is_absolute_url(path) || path.starts_with('/') {
        resolve_url(api_base, path)
    } else {
        format!(
            "{}{}/{}",
            api_base.trim_end_matches('/'),
            directory.trim_end_matches('/'),
            path
        )
    }
}
