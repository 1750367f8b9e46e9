//! Candidate files: locally selected images awaiting batch submission

use crate::preview::PreviewHandle;
use bytes::Bytes;
use std::path::Path;

/// Fallback MIME type when nothing better is known
pub const OCTET_STREAM: &str = "application/octet-stream";

/// File-like input offered to `UploadManager::add_files`
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateInput {
    /// File name sent as the multipart part's file name
    pub name: String,
    /// Declared MIME type, e.g. `image/png`
    pub mime: String,
    pub bytes: Bytes,
}

impl CandidateInput {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, sniffing its MIME type
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = Bytes::from(tokio::fs::read(path).await?);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = detect_mime(&name, &bytes);
        Ok(Self { name, mime, bytes })
    }

    /// Only `image/*` inputs are eligible for a batch
    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Admitted batch entry owning its preview handle
#[derive(Debug)]
pub struct CandidateFile {
    pub input: CandidateInput,
    pub preview: PreviewHandle,
}

impl CandidateFile {
    pub fn name(&self) -> &str {
        &self.input.name
    }

    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }
}

/// MIME type from magic bytes, falling back to the file extension
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    mime_from_extension(name).unwrap_or(OCTET_STREAM).to_string()
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Last path segment of a URL, used as the upload file name
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}
