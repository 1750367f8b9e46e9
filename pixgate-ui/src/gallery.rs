//! Gallery Viewer
//!
//! Holds the "all", "pass" and "fail" lists of processed image URLs. Each
//! refresh replaces a list wholesale; a failed fetch leaves that one list as
//! it was and never blocks the others.

use crate::backend::BackendClient;
use crate::AppContext;
use chrono::Utc;
use pixgate_common::api::{self, resolve_in_directory, resolve_url};
use pixgate_common::{EventBus, GalleryList, PixgateEvent, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Which endpoints back each list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GalleryLayout {
    /// Upload page: every original, newest first
    #[default]
    Uploads,
    /// Dashboard page: brightness pass/fail verdicts
    Dashboard,
    /// Screening page: resized copies plus the filter pass output directories
    Screening,
}

/// Endpoint of one list and how its entries resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSource {
    pub endpoint: &'static str,
    /// Set for directory listings whose bare entries are relative to the endpoint
    pub directory_listing: bool,
}

impl ListSource {
    const fn paths(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            directory_listing: false,
        }
    }

    const fn directory(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            directory_listing: true,
        }
    }

    pub fn resolve(&self, api_base: &str, path: &str) -> String {
        if self.directory_listing {
            resolve_in_directory(api_base, self.endpoint, path)
        } else {
            resolve_url(api_base, path)
        }
    }
}

impl GalleryLayout {
    /// Source of `list`, or `None` when the layout does not show it
    pub fn source(self, list: GalleryList) -> Option<ListSource> {
        match (self, list) {
            (GalleryLayout::Uploads, GalleryList::All) => Some(ListSource::paths(api::LIST_PATH)),
            (GalleryLayout::Uploads, _) => None,
            (GalleryLayout::Dashboard, GalleryList::All) => None,
            (GalleryLayout::Dashboard, GalleryList::Pass) => {
                Some(ListSource::paths(api::BRIGHTNESS_PASS_PATH))
            }
            (GalleryLayout::Dashboard, GalleryList::Fail) => {
                Some(ListSource::paths(api::BRIGHTNESS_FAIL_PATH))
            }
            (GalleryLayout::Screening, GalleryList::All) => {
                Some(ListSource::directory(api::IMAGES_RESIZED_PATH))
            }
            (GalleryLayout::Screening, GalleryList::Pass) => {
                Some(ListSource::directory(api::IMAGES_BRIGHTNESS_PASS_PATH))
            }
            (GalleryLayout::Screening, GalleryList::Fail) => {
                Some(ListSource::directory(api::IMAGES_BRIGHTNESS_FAIL_PATH))
            }
        }
    }
}

impl fmt::Display for GalleryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleryLayout::Uploads => write!(f, "uploads"),
            GalleryLayout::Dashboard => write!(f, "dashboard"),
            GalleryLayout::Screening => write!(f, "screening"),
        }
    }
}

impl FromStr for GalleryLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploads" => Ok(GalleryLayout::Uploads),
            "dashboard" => Ok(GalleryLayout::Dashboard),
            "screening" => Ok(GalleryLayout::Screening),
            other => Err(format!(
                "unknown layout '{}' (expected uploads, dashboard or screening)",
                other
            )),
        }
    }
}

/// Snapshot of the three lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GalleryLists {
    pub all: Vec<String>,
    pub pass: Vec<String>,
    pub fail: Vec<String>,
}

impl GalleryLists {
    pub fn get(&self, list: GalleryList) -> &[String] {
        match list {
            GalleryList::All => &self.all,
            GalleryList::Pass => &self.pass,
            GalleryList::Fail => &self.fail,
        }
    }

    fn get_mut(&mut self, list: GalleryList) -> &mut Vec<String> {
        match list {
            GalleryList::All => &mut self.all,
            GalleryList::Pass => &mut self.pass,
            GalleryList::Fail => &mut self.fail,
        }
    }
}

/// Outcome of one `refresh`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub updated: Vec<GalleryList>,
    /// Lists whose fetch failed, with the reason; their contents were kept
    pub failed: Vec<(GalleryList, String)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Read-only view over the backend's processed images
pub struct GalleryViewer {
    pub(crate) backend: BackendClient,
    pub(crate) events: EventBus,
    layout: GalleryLayout,
    lists: RwLock<GalleryLists>,
}

impl GalleryViewer {
    pub fn new(ctx: &AppContext, layout: GalleryLayout) -> Self {
        Self {
            backend: ctx.backend.clone(),
            events: ctx.events.clone(),
            layout,
            lists: RwLock::new(GalleryLists::default()),
        }
    }

    pub fn layout(&self) -> GalleryLayout {
        self.layout
    }

    pub async fn lists(&self) -> GalleryLists {
        self.lists.read().await.clone()
    }

    pub async fn all(&self) -> Vec<String> {
        self.lists.read().await.all.clone()
    }

    pub async fn pass(&self) -> Vec<String> {
        self.lists.read().await.pass.clone()
    }

    pub async fn fail(&self) -> Vec<String> {
        self.lists.read().await.fail.clone()
    }

    /// Re-fetch every list the layout shows
    ///
    /// The fetches run concurrently and are isolated: a failure is logged and
    /// reported, and that list keeps its previous contents.
    pub async fn refresh(&self) -> RefreshReport {
        self.refresh_from(self.layout).await
    }

    /// Re-fetch the lists `layout` defines into this viewer
    pub(crate) async fn refresh_from(&self, layout: GalleryLayout) -> RefreshReport {
        let (all, pass, fail) = tokio::join!(
            self.fetch_list(layout, GalleryList::All),
            self.fetch_list(layout, GalleryList::Pass),
            self.fetch_list(layout, GalleryList::Fail),
        );

        let mut report = RefreshReport::default();
        let mut lists = self.lists.write().await;

        for (list, outcome) in [
            (GalleryList::All, all),
            (GalleryList::Pass, pass),
            (GalleryList::Fail, fail),
        ] {
            match outcome {
                None => {}
                Some(Ok(urls)) => {
                    let count = urls.len();
                    *lists.get_mut(list) = urls;
                    debug!(list = %list, count, "Gallery list refreshed");
                    report.updated.push(list);
                    self.events.emit_lossy(PixgateEvent::GalleryRefreshed {
                        list,
                        count,
                        timestamp: Utc::now(),
                    });
                }
                Some(Err(e)) => {
                    warn!(list = %list, error = %e, "Gallery list refresh failed; keeping previous contents");
                    report.failed.push((list, e.to_string()));
                    self.events.emit_lossy(PixgateEvent::GalleryRefreshFailed {
                        list,
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        report
    }

    async fn fetch_list(
        &self,
        layout: GalleryLayout,
        list: GalleryList,
    ) -> Option<Result<Vec<String>>> {
        let source = layout.source(list)?;
        let api_base = &self.backend.config().api_base;

        let outcome = self.backend.fetch_path_list(source.endpoint).await.map(|paths| {
            let mut urls: Vec<String> = paths
                .iter()
                .map(|path| source.resolve(api_base, path))
                .collect();
            // Backend lists oldest first; the gallery shows newest first
            if list == GalleryList::All {
                urls.reverse();
            }
            urls
        });
        Some(outcome)
    }

    /// Show freshly uploaded images ahead of the existing "all" entries
    pub async fn prepend_uploaded(&self, urls: &[String]) {
        let mut lists = self.lists.write().await;
        lists.all.splice(0..0, urls.iter().cloned());
        debug!(added = urls.len(), total = lists.all.len(), "Prepended uploaded images");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sources() {
        assert_eq!(
            GalleryLayout::Uploads.source(GalleryList::All),
            Some(ListSource::paths(api::LIST_PATH))
        );
        assert_eq!(GalleryLayout::Uploads.source(GalleryList::Pass), None);
        assert_eq!(GalleryLayout::Dashboard.source(GalleryList::All), None);
        assert!(GalleryLayout::Screening
            .source(GalleryList::Fail)
            .is_some_and(|s| s.directory_listing));
    }

    #[test]
    fn test_layout_parse_roundtrips_display() {
        for layout in [
            GalleryLayout::Uploads,
            GalleryLayout::Dashboard,
            GalleryLayout::Screening,
        ] {
            assert_eq!(layout.to_string().parse::<GalleryLayout>(), Ok(layout));
        }
        assert!("grid".parse::<GalleryLayout>().is_err());
    }

    #[test]
    fn test_directory_source_resolution() {
        let source = ListSource::directory(api::IMAGES_BRIGHTNESS_FAIL_PATH);
        assert_eq!(
            source.resolve("http://h:8000", "dark.jpg"),
            "http://h:8000/images/brightness_fail/dark.jpg"
        );
        let source = ListSource::paths(api::BRIGHTNESS_FAIL_PATH);
        assert_eq!(
            source.resolve("http://h:8000", "/images/brightness_fail/dark.jpg"),
            "http://h:8000/images/brightness_fail/dark.jpg"
        );
    }
}
