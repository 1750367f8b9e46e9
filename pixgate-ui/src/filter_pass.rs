//! Filter pass: re-submit processed images one by one for brightness checks
//!
//! Images are handled strictly in input order, one fetch-then-check round
//! trip at a time. Per-image failures are logged and skipped; the loop never
//! retries and never aborts early except on cancellation. The gallery is
//! refreshed once when the loop ends, from the screening output directories
//! whatever the viewer's own layout.

use crate::candidate::{detect_mime, file_name_from_url};
use crate::gallery::{GalleryLayout, GalleryViewer, RefreshReport};
use crate::progress::percent_of;
use chrono::Utc;
use pixgate_common::api::BrightnessCheckResponse;
use pixgate_common::PixgateEvent;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why one image was skipped
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    Fetch(pixgate_common::Error),

    #[error("image has no content")]
    EmptyContent,

    #[error("brightness check failed: {0}")]
    Check(pixgate_common::Error),
}

/// Outcome of one filter pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterReport {
    /// Images offered
    pub total: usize,
    /// Images accepted by the brightness-check endpoint
    pub checked: usize,
    pub skipped: usize,
    /// Verdicts reported by the backend, when it sends them
    pub passed: usize,
    pub failed: usize,
    /// Loop stopped before the end because the token was cancelled
    pub cancelled: bool,
    /// Result of the closing refresh
    pub refresh: RefreshReport,
}

impl GalleryViewer {
    /// Run a filter pass over `all_image_urls`, then refresh the lists
    ///
    /// `cancel` is checked before each image; once cancelled no further image
    /// is started, and the closing refresh still runs. That refresh always
    /// reads the [`GalleryLayout::Screening`] sources (`/images/resized` and
    /// `/images/brightness_pass|fail`).
    pub async fn run_filter_pass(
        &self,
        all_image_urls: &[String],
        cancel: &CancellationToken,
    ) -> FilterReport {
        let total = all_image_urls.len();
        let mut report = FilterReport {
            total,
            ..FilterReport::default()
        };
        info!(total, "Starting filter pass");

        for (index, url) in all_image_urls.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = index, total, "Filter pass cancelled");
                report.cancelled = true;
                break;
            }

            match self.check_one(index, url).await {
                Ok(verdict) => {
                    report.checked += 1;
                    match verdict.and_then(|v| v.passed) {
                        Some(true) => report.passed += 1,
                        Some(false) => report.failed += 1,
                        None => {}
                    }
                }
                Err(reason) => {
                    warn!(url = %url, reason = %reason, "Skipping image in filter pass");
                    report.skipped += 1;
                    self.events.emit_lossy(PixgateEvent::FilterItemSkipped {
                        url: url.clone(),
                        reason: reason.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }

            let completed = index + 1;
            self.events.emit_lossy(PixgateEvent::FilterProgress {
                completed,
                total,
                percent: percent_of(completed as u64, total as u64),
                timestamp: Utc::now(),
            });
        }

        info!(
            checked = report.checked,
            skipped = report.skipped,
            cancelled = report.cancelled,
            "Filter pass finished"
        );
        self.events.emit_lossy(PixgateEvent::FilterCompleted {
            checked: report.checked,
            skipped: report.skipped,
            cancelled: report.cancelled,
            timestamp: Utc::now(),
        });

        report.refresh = self.refresh_from(GalleryLayout::Screening).await;
        report
    }

    async fn check_one(
        &self,
        index: usize,
        url: &str,
    ) -> Result<Option<BrightnessCheckResponse>, SkipReason> {
        let bytes = self.backend.fetch_bytes(url).await.map_err(SkipReason::Fetch)?;
        if bytes.is_empty() {
            return Err(SkipReason::EmptyContent);
        }

        let file_name = file_name_from_url(url).unwrap_or_else(|| format!("image-{}.jpg", index));
        let mime = detect_mime(&file_name, &bytes);
        debug!(url = %url, file_name = %file_name, mime = %mime, "Checking brightness");

        self.backend
            .check_brightness(&file_name, &mime, bytes)
            .await
            .map_err(SkipReason::Check)
    }
}
