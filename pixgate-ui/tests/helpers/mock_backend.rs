//! In-process mock of the screening backend
//!
//! Serves the REST contract on an ephemeral port and records every request so
//! tests can assert on what the client sent.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One multipart part received by the mock
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Debug)]
struct MockInner {
    lists: HashMap<String, Vec<String>>,
    failing_lists: HashSet<String>,
    upload_status: u16,
    upload_body: String,
    upload_delay: Duration,
    upload_requests: Vec<Vec<ReceivedPart>>,
    originals: HashMap<String, Vec<u8>>,
    checked: Vec<String>,
    check_status: u16,
    check_truncated: bool,
}

impl Default for MockInner {
    fn default() -> Self {
        Self {
            lists: HashMap::new(),
            failing_lists: HashSet::new(),
            upload_status: 200,
            upload_body: json!({"count": 0, "files": []}).to_string(),
            upload_delay: Duration::ZERO,
            upload_requests: Vec::new(),
            originals: HashMap::new(),
            checked: Vec::new(),
            check_status: 200,
            check_truncated: false,
        }
    }
}

/// Handle to the running mock's state
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockInner>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response of a list endpoint such as `/list`
    pub fn set_list(&self, endpoint: &str, paths: &[&str]) {
        self.inner
            .lock()
            .unwrap()
            .lists
            .insert(endpoint.to_string(), paths.iter().map(|p| p.to_string()).collect());
    }

    /// Make a list endpoint answer 500
    pub fn fail_list(&self, endpoint: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_lists
            .insert(endpoint.to_string());
    }

    pub fn set_upload_response(&self, status: u16, body: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.upload_status = status;
        inner.upload_body = body.to_string();
    }

    pub fn set_upload_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().upload_delay = delay;
    }

    /// Serve `bytes` at `/originals/{name}`
    pub fn add_original(&self, name: &str, bytes: &[u8]) {
        self.inner
            .lock()
            .unwrap()
            .originals
            .insert(name.to_string(), bytes.to_vec());
    }

    pub fn set_check_status(&self, status: u16) {
        self.inner.lock().unwrap().check_status = status;
    }

    /// Make `/check-brightness` answer 200 and then abort the body mid-stream
    pub fn set_check_truncated(&self, truncated: bool) {
        self.inner.lock().unwrap().check_truncated = truncated;
    }

    pub fn upload_requests(&self) -> Vec<Vec<ReceivedPart>> {
        self.inner.lock().unwrap().upload_requests.clone()
    }

    /// File names received by `/check-brightness`, in arrival order
    pub fn checked(&self) -> Vec<String> {
        self.inner.lock().unwrap().checked.clone()
    }
}

/// Start the mock on 127.0.0.1 and return its base URL
pub async fn spawn_mock_backend(mock: MockBackend) -> String {
    let app = Router::new()
        .route("/list", get(list_handler))
        .route("/brightness-pass", get(list_handler))
        .route("/brightness-fail", get(list_handler))
        .route("/images/brightness_pass", get(list_handler))
        .route("/images/brightness_fail", get(list_handler))
        .route("/images/resized", get(list_handler))
        .route("/upload-multi", post(upload_handler))
        .route("/check-brightness", post(check_handler))
        .route("/originals/:name", get(original_handler))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub fn unused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn list_handler(State(mock): State<MockBackend>, uri: axum::http::Uri) -> Response {
    let inner = mock.inner.lock().unwrap();
    let endpoint = uri.path().to_string();

    if inner.failing_lists.contains(&endpoint) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "list unavailable").into_response();
    }

    let paths = inner.lists.get(&endpoint).cloned().unwrap_or_default();
    Json(paths).into_response()
}

async fn upload_handler(State(mock): State<MockBackend>, mut multipart: Multipart) -> Response {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap();
        parts.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            len: data.len(),
        });
    }

    let (status, body, delay) = {
        let mut inner = mock.inner.lock().unwrap();
        inner.upload_requests.push(parts);
        (inner.upload_status, inner.upload_body.clone(), inner.upload_delay)
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    (
        StatusCode::from_u16(status).unwrap(),
        [("content-type", "application/json")],
        body,
    )
        .into_response()
}

async fn check_handler(State(mock): State<MockBackend>, mut multipart: Multipart) -> Response {
    let mut file_name = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        file_name = field.file_name().unwrap_or_default().to_string();
        let _ = field.bytes().await.unwrap();
    }

    let (status, truncated) = {
        let mut inner = mock.inner.lock().unwrap();
        inner.checked.push(file_name.clone());
        (inner.check_status, inner.check_truncated)
    };

    if truncated {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(br#"{"passed": tr"#.to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend went away")),
        ];
        return Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();
    }

    if status != 200 {
        return (StatusCode::from_u16(status).unwrap(), "check failed").into_response();
    }

    let passed = !file_name.starts_with("dark");
    Json(json!({
        "filename": file_name,
        "brightness": if passed { 128.0 } else { 20.0 },
        "passed": passed,
        "saved_to": format!("/brightness/{}/{}", if passed { "pass" } else { "fail" }, file_name),
    }))
    .into_response()
}

async fn original_handler(State(mock): State<MockBackend>, Path(name): Path<String>) -> Response {
    let inner = mock.inner.lock().unwrap();
    match inner.originals.get(&name) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
