//! HTTP client for the screening backend

use bytes::Bytes;
use pixgate_common::api::{self, BrightnessCheckResponse, UploadResponse};
use pixgate_common::{ApiConfig, Error, Result};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use tracing::debug;

const USER_AGENT: &str = concat!("pixgate/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper over `reqwest::Client` bound to one API base
///
/// Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl BackendClient {
    pub fn new(config: Arc<ApiConfig>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// GET an endpoint returning a JSON array of path strings
    pub async fn fetch_path_list(&self, path: &str) -> Result<Vec<String>> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "Fetching image list");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| Error::ResponseParse(e.to_string()))
    }

    /// POST a batch form to `/upload-multi`
    ///
    /// Only HTTP 200 counts as success. The body is parsed after the status
    /// check so a malformed success body surfaces as `ResponseParse`.
    pub async fn upload_multi(&self, form: Form) -> Result<UploadResponse> {
        let url = self.config.endpoint(api::UPLOAD_MULTI_PATH);
        debug!(url = %url, "Submitting upload batch");

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Upload {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::ResponseParse(e.to_string()))
    }

    /// GET raw image content from an absolute URL
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }

    /// POST one image to `/check-brightness`
    ///
    /// The verdict body is optional; `Ok(None)` means the backend accepted the
    /// image without a readable verdict.
    pub async fn check_brightness(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Bytes,
    ) -> Result<Option<BrightnessCheckResponse>> {
        let url = self.config.endpoint(api::CHECK_BRIGHTNESS_PATH);
        let part = Part::stream_with_length(bytes.clone(), bytes.len() as u64)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| Error::Validation(format!("Invalid MIME type '{}': {}", mime, e)))?;
        let form = Form::new().part(api::CHECK_FIELD, part);

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(serde_json::from_slice(&body).ok())
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("api_base", &self.config.api_base)
            .finish()
    }
}
