//! pixgate-ui library interface
//!
//! Client-side components of the image screening tool: the Upload Manager
//! staging and submitting batches, the Gallery Viewer listing processed
//! images, and the optional filter pass. The `pixgate` binary drives them
//! from the command line; integration tests drive them against a mock backend.

pub mod backend;
pub mod candidate;
pub mod filter_pass;
pub mod gallery;
pub mod notice;
pub mod preview;
pub mod progress;
pub mod upload_manager;

pub use crate::candidate::{CandidateFile, CandidateInput};
pub use crate::filter_pass::FilterReport;
pub use crate::gallery::{GalleryLayout, GalleryLists, GalleryViewer, RefreshReport};
pub use crate::upload_manager::{AddOutcome, UploadManager};

use crate::backend::BackendClient;
use crate::notice::NoticeBoard;
use crate::preview::PreviewRegistry;
use pixgate_common::{ApiConfig, EventBus, Result};
use std::sync::Arc;

/// Collaborators shared by every component
///
/// Built once from the resolved configuration and handed to each component
/// constructor; nothing reads the API base from a global.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ApiConfig>,
    pub events: EventBus,
    pub backend: BackendClient,
    pub previews: PreviewRegistry,
    pub notices: NoticeBoard,
}

impl AppContext {
    pub fn new(config: ApiConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let events = EventBus::new(config.event_capacity);
        let backend = BackendClient::new(config.clone())?;

        Ok(Self {
            notices: NoticeBoard::new(events.clone()),
            previews: PreviewRegistry::new(),
            config,
            events,
            backend,
        })
    }
}
