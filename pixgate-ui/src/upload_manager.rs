//! Upload Manager
//!
//! Owns the batch of candidate files, their preview handles and the upload
//! progress, and submits the batch to `/upload-multi` as one multipart request.
//!
//! Ownership rule for previews: a candidate's handle is released exactly once,
//! by [`UploadManager::dispose`], when the file leaves the batch (removal,
//! clear, replacement or successful upload).

use crate::backend::BackendClient;
use crate::candidate::{CandidateFile, CandidateInput};
use crate::notice::NoticeBoard;
use crate::preview::PreviewRegistry;
use crate::progress::ProgressTracker;
use crate::AppContext;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use pixgate_common::api::{self, UploadResultItem};
use pixgate_common::{ApiConfig, CapacityPolicy, Error, EventBus, PixgateEvent, Result};
use reqwest::multipart::{Form, Part};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Size of the body chunks progress is accounted in
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Result of one `add_files` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Files admitted into the batch
    pub admitted: usize,
    /// Image files dropped because of the capacity bound
    pub skipped: usize,
    /// Non-image inputs discarded before the count check
    pub filtered_out: usize,
}

#[derive(Default)]
struct BatchState {
    files: Vec<CandidateFile>,
}

/// Clears the in-flight flag on every exit path of `submit`
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bounded batch of candidate files plus its submission workflow
pub struct UploadManager {
    config: Arc<ApiConfig>,
    backend: BackendClient,
    previews: PreviewRegistry,
    notices: NoticeBoard,
    events: EventBus,
    state: RwLock<BatchState>,
    uploading: AtomicBool,
    progress: Arc<AtomicU8>,
}

impl UploadManager {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            config: ctx.config.clone(),
            backend: ctx.backend.clone(),
            previews: ctx.previews.clone(),
            notices: ctx.notices.clone(),
            events: ctx.events.clone(),
            state: RwLock::new(BatchState::default()),
            uploading: AtomicBool::new(false),
            progress: Arc::new(AtomicU8::new(0)),
        }
    }

    pub fn max_files(&self) -> usize {
        self.config.max_files
    }

    pub fn capacity_policy(&self) -> CapacityPolicy {
        self.config.capacity_policy
    }

    /// True while a submission is in flight; every mutating control is disabled
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Upload progress in percent, 0 when idle
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.files.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.files.is_empty()
    }

    /// Names of the batched files, in order
    pub async fn file_names(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .files
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Preview URLs of the batched files, in order
    pub async fn preview_urls(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .files
            .iter()
            .map(|f| f.preview_url().to_string())
            .collect()
    }

    /// Validate and stage a selection
    ///
    /// Non-image inputs are discarded first. An empty remainder is a
    /// `Validation` error and leaves the batch untouched. Otherwise the
    /// configured [`CapacityPolicy`] decides how many files are admitted.
    pub async fn add_files(&self, candidates: Vec<CandidateInput>) -> Result<AddOutcome> {
        let mut state = self.state.write().await;
        if self.is_uploading() {
            return Err(Error::UploadInProgress);
        }

        let offered = candidates.len();
        let images: Vec<CandidateInput> = candidates.into_iter().filter(|c| c.is_image()).collect();
        let filtered_out = offered - images.len();

        if images.is_empty() {
            drop(state);
            let err = Error::Validation("No supported image files".to_string());
            self.notices.post_error(err.user_message()).await;
            return Err(err);
        }

        let max = self.config.max_files;
        let room = match self.config.capacity_policy {
            CapacityPolicy::Append => max.saturating_sub(state.files.len()),
            CapacityPolicy::Replace => {
                for file in state.files.drain(..) {
                    self.dispose(file);
                }
                max
            }
        };

        let skipped = images.len().saturating_sub(room);
        let admitted: Vec<CandidateFile> = images
            .into_iter()
            .take(room)
            .map(|input| {
                let preview = self.previews.create(&input.name, input.bytes.clone());
                CandidateFile { input, preview }
            })
            .collect();
        let admitted_count = admitted.len();
        state.files.extend(admitted);
        let len = state.files.len();
        drop(state);

        debug!(
            admitted = admitted_count,
            skipped,
            filtered_out,
            batch = len,
            policy = %self.config.capacity_policy,
            "Files added to batch"
        );
        self.emit_batch_changed(len);

        if skipped > 0 {
            self.notices
                .post_warning(format!("Limit is {} images, skipped {}", max, skipped))
                .await;
        } else {
            self.notices
                .post_info(format!("Added {} images", admitted_count))
                .await;
        }

        Ok(AddOutcome {
            admitted: admitted_count,
            skipped,
            filtered_out,
        })
    }

    /// Remove the file at `index`
    ///
    /// Returns `Ok(false)` without touching anything when out of bounds.
    pub async fn remove_file(&self, index: usize) -> Result<bool> {
        let mut state = self.state.write().await;
        if self.is_uploading() {
            return Err(Error::UploadInProgress);
        }
        if index >= state.files.len() {
            return Ok(false);
        }

        let file = state.files.remove(index);
        self.dispose(file);
        let len = state.files.len();
        drop(state);

        self.emit_batch_changed(len);
        Ok(true)
    }

    /// Empty the batch, reset progress and dismiss notices
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if self.is_uploading() {
            return Err(Error::UploadInProgress);
        }
        self.clear_locked(&mut state);
        drop(state);

        self.notices.dismiss_all().await;
        self.emit_batch_changed(0);
        Ok(())
    }

    /// Submit the whole batch as one multipart request
    ///
    /// An empty batch is a no-op returning no items. On HTTP 200 the resolved
    /// items are handed to `on_uploaded`, the batch is cleared and the items
    /// are returned. Any failure leaves the batch intact for a retry.
    pub async fn submit<F>(&self, on_uploaded: F) -> Result<Vec<UploadResultItem>>
    where
        F: FnOnce(&[UploadResultItem]),
    {
        let (snapshot, _guard) = {
            let state = self.state.write().await;
            if self.is_uploading() {
                return Err(Error::UploadInProgress);
            }
            if state.files.is_empty() {
                debug!("Submit ignored: batch is empty");
                return Ok(Vec::new());
            }
            self.uploading.store(true, Ordering::SeqCst);
            let snapshot: Vec<CandidateInput> =
                state.files.iter().map(|f| f.input.clone()).collect();
            (snapshot, InFlightGuard(&self.uploading))
        };

        self.notices.dismiss_alert().await;
        self.progress.store(0, Ordering::SeqCst);

        let total_bytes: u64 = snapshot.iter().map(|f| f.len() as u64).sum();
        info!(files = snapshot.len(), total_bytes, "Uploading batch");
        self.events.emit_lossy(PixgateEvent::UploadStarted {
            files: snapshot.len(),
            total_bytes,
            timestamp: Utc::now(),
        });

        let tracker = Arc::new(ProgressTracker::new(
            total_bytes,
            self.progress.clone(),
            self.events.clone(),
        ));

        let outcome = match build_form(&snapshot, &tracker) {
            Ok(form) => self.backend.upload_multi(form).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                tracker.finish();
                let items = response.into_items(&self.config.api_base);
                on_uploaded(&items);

                {
                    let mut state = self.state.write().await;
                    self.clear_locked(&mut state);
                }
                self.notices.dismiss_all().await;
                self.emit_batch_changed(0);

                info!(count = items.len(), "Batch uploaded");
                self.events.emit_lossy(PixgateEvent::UploadCompleted {
                    count: items.len(),
                    timestamp: Utc::now(),
                });
                self.notices.post_info("Upload complete").await;
                Ok(items)
            }
            Err(e) => {
                warn!(error = %e, "Batch upload failed; batch kept for retry");
                self.events.emit_lossy(PixgateEvent::UploadFailed {
                    reason: e.to_string(),
                    status: e.status(),
                    timestamp: Utc::now(),
                });
                self.notices.post_error(e.user_message()).await;
                Err(e)
            }
        }
    }

    /// Release a file's preview as it leaves the batch
    fn dispose(&self, file: CandidateFile) {
        if !self.previews.release(&file.preview) {
            debug!(name = %file.name(), "Preview was already released");
        }
    }

    fn clear_locked(&self, state: &mut BatchState) {
        for file in state.files.drain(..) {
            self.dispose(file);
        }
        self.progress.store(0, Ordering::SeqCst);
    }

    fn emit_batch_changed(&self, len: usize) {
        self.events.emit_lossy(PixgateEvent::BatchChanged {
            len,
            max: self.config.max_files,
            timestamp: Utc::now(),
        });
    }
}

impl Drop for UploadManager {
    fn drop(&mut self) {
        let files: Vec<CandidateFile> = self.state.get_mut().files.drain(..).collect();
        for file in files {
            self.dispose(file);
        }
    }
}

/// Build the batch form, one streamed part per file under the shared field
fn build_form(files: &[CandidateInput], tracker: &Arc<ProgressTracker>) -> Result<Form> {
    let mut form = Form::new();
    for file in files {
        let part = Part::stream_with_length(progress_body(&file.bytes, tracker), file.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| Error::Validation(format!("Invalid MIME type '{}': {}", file.mime, e)))?;
        form = form.part(api::UPLOAD_FIELD, part);
    }
    Ok(form)
}

/// Body streaming `bytes` in chunks, counting each chunk as it is handed over
fn progress_body(bytes: &Bytes, tracker: &Arc<ProgressTracker>) -> reqwest::Body {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
        .collect();

    let tracker = tracker.clone();
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}
