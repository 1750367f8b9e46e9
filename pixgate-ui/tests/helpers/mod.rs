//! Test Helper Utilities
//!
//! Shared utilities for testing pixgate-ui against a local mock backend

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{spawn_mock_backend, unused_base_url, MockBackend};

use bytes::Bytes;
use pixgate_common::ApiConfig;
use pixgate_ui::{AppContext, CandidateInput};

/// PNG signature followed by `len` filler bytes
pub fn png_bytes(len: usize) -> Bytes {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(len.max(8), 0x42);
    Bytes::from(bytes)
}

pub fn image(name: &str) -> CandidateInput {
    CandidateInput::new(name, "image/png", png_bytes(64))
}

pub fn sized_image(name: &str, len: usize) -> CandidateInput {
    CandidateInput::new(name, "image/png", png_bytes(len))
}

pub fn text_file(name: &str) -> CandidateInput {
    CandidateInput::new(name, "text/plain", Bytes::from_static(b"not an image"))
}

pub fn images(count: usize) -> Vec<CandidateInput> {
    (0..count).map(|i| image(&format!("img-{}.png", i))).collect()
}

pub fn test_context(api_base: &str) -> AppContext {
    AppContext::new(ApiConfig::new(api_base)).unwrap()
}

pub fn test_context_with(config: ApiConfig) -> AppContext {
    AppContext::new(config).unwrap()
}
