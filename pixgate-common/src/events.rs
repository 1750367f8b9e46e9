//! Event types for the pixgate event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Pixgate event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PixgateEvent {
    /// Batch contents changed (add, remove, clear)
    BatchChanged {
        len: usize,
        max: usize,
        timestamp: DateTime<Utc>,
    },

    /// Batch submission started
    UploadStarted {
        files: usize,
        total_bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// Upload progress increased
    ///
    /// Emitted only when `percent` grows, so a subscriber sees a
    /// non-decreasing sequence within one submission.
    UploadProgress {
        percent: u8,
        bytes_sent: u64,
        total_bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// Batch submission succeeded
    UploadCompleted {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Batch submission failed; batch left intact
    UploadFailed {
        reason: String,
        status: Option<u16>,
        timestamp: DateTime<Utc>,
    },

    /// Transient user-facing notice posted
    Notice {
        level: NoticeLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// One gallery list replaced after a successful fetch
    GalleryRefreshed {
        list: GalleryList,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One gallery list fetch failed; previous contents kept
    GalleryRefreshFailed {
        list: GalleryList,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Filter pass advanced by one image
    FilterProgress {
        completed: usize,
        total: usize,
        percent: u8,
        timestamp: DateTime<Utc>,
    },

    /// Filter pass skipped an image
    FilterItemSkipped {
        url: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Filter pass loop finished (before the final refresh)
    FilterCompleted {
        checked: usize,
        skipped: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

impl PixgateEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            PixgateEvent::BatchChanged { .. } => "BatchChanged",
            PixgateEvent::UploadStarted { .. } => "UploadStarted",
            PixgateEvent::UploadProgress { .. } => "UploadProgress",
            PixgateEvent::UploadCompleted { .. } => "UploadCompleted",
            PixgateEvent::UploadFailed { .. } => "UploadFailed",
            PixgateEvent::Notice { .. } => "Notice",
            PixgateEvent::GalleryRefreshed { .. } => "GalleryRefreshed",
            PixgateEvent::GalleryRefreshFailed { .. } => "GalleryRefreshFailed",
            PixgateEvent::FilterProgress { .. } => "FilterProgress",
            PixgateEvent::FilterItemSkipped { .. } => "FilterItemSkipped",
            PixgateEvent::FilterCompleted { .. } => "FilterCompleted",
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Error,
    /// Non-fatal, e.g. a batch truncated to the cap
    Warning,
    Info,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Error => write!(f, "error"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Info => write!(f, "info"),
        }
    }
}

/// Gallery list category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GalleryList {
    All,
    Pass,
    Fail,
}

impl GalleryList {
    pub const ALL: [GalleryList; 3] = [GalleryList::All, GalleryList::Pass, GalleryList::Fail];
}

impl fmt::Display for GalleryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleryList::All => write!(f, "all"),
            GalleryList::Pass => write!(f, "pass"),
            GalleryList::Fail => write!(f, "fail"),
        }
    }
}

/// Central event distribution over `tokio::sync::broadcast`
///
/// Publishing never blocks; slow subscribers see `Lagged` instead of holding
/// up the upload. Cloning shares the same channel.
///
/// # Examples
///
/// ```
/// use pixgate_common::events::{EventBus, PixgateEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PixgateEvent::UploadCompleted {
///     count: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(PixgateEvent::UploadCompleted { count: 3, .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PixgateEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PixgateEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PixgateEvent,
    ) -> Result<usize, broadcast::error::SendError<PixgateEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PixgateEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
