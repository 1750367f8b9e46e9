//! Transient user-facing notices
//!
//! The board holds at most one alert (error or warning) and one info notice.
//! Posting replaces the previous notice in that slot, and notices dismiss
//! themselves once their time-to-live has passed.

use chrono::Utc;
use pixgate_common::{EventBus, NoticeLevel, PixgateEvent};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Lifetime of error and warning notices
pub const ALERT_NOTICE_TTL: Duration = Duration::from_secs(4);
/// Lifetime of info notices
pub const INFO_NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    expires_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Default)]
struct Slots {
    alert: Option<Notice>,
    info: Option<Notice>,
}

/// Auto-dismissing notice slots shared by the components
#[derive(Clone)]
pub struct NoticeBoard {
    slots: Arc<RwLock<Slots>>,
    events: EventBus,
    alert_ttl: Duration,
    info_ttl: Duration,
}

impl NoticeBoard {
    pub fn new(events: EventBus) -> Self {
        Self::with_ttls(events, ALERT_NOTICE_TTL, INFO_NOTICE_TTL)
    }

    pub fn with_ttls(events: EventBus, alert_ttl: Duration, info_ttl: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(Slots::default())),
            events,
            alert_ttl,
            info_ttl,
        }
    }

    pub async fn post_error(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Error, message.into()).await;
    }

    pub async fn post_warning(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Warning, message.into()).await;
    }

    pub async fn post_info(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Info, message.into()).await;
    }

    async fn post(&self, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Error | NoticeLevel::Warning => warn!(level = %level, "{}", message),
            NoticeLevel::Info => info!("{}", message),
        }

        let ttl = match level {
            NoticeLevel::Info => self.info_ttl,
            _ => self.alert_ttl,
        };
        let notice = Notice {
            level,
            message: message.clone(),
            expires_at: Instant::now() + ttl,
        };

        {
            let mut slots = self.slots.write().await;
            match level {
                NoticeLevel::Info => slots.info = Some(notice),
                _ => slots.alert = Some(notice),
            }
        }

        self.events.emit_lossy(PixgateEvent::Notice {
            level,
            message,
            timestamp: Utc::now(),
        });
    }

    /// Notices still within their lifetime, alert first
    pub async fn current(&self) -> Vec<Notice> {
        let now = Instant::now();
        let mut slots = self.slots.write().await;

        if slots.alert.as_ref().is_some_and(|n| n.is_expired(now)) {
            slots.alert = None;
        }
        if slots.info.as_ref().is_some_and(|n| n.is_expired(now)) {
            slots.info = None;
        }

        slots.alert.iter().chain(slots.info.iter()).cloned().collect()
    }

    pub async fn dismiss_alert(&self) {
        self.slots.write().await.alert = None;
    }

    pub async fn dismiss_all(&self) {
        let mut slots = self.slots.write().await;
        slots.alert = None;
        slots.info = None;
    }
}
