//! Progress accounting for batch uploads

use chrono::Utc;
use pixgate_common::{EventBus, PixgateEvent};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// `round(done / total * 100)`, with an empty total counting as complete
pub fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    // Half-up rounding in integer arithmetic
    ((200 * done + total) / (2 * total)) as u8
}

/// Byte counter of one submission
///
/// The percent cell is shared with the upload manager so `progress()` can be
/// read while the request is in flight. The cell only ever grows until the
/// manager resets it.
pub struct ProgressTracker {
    total_bytes: u64,
    sent: AtomicU64,
    percent: Arc<AtomicU8>,
    events: EventBus,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, percent: Arc<AtomicU8>, events: EventBus) -> Self {
        Self {
            total_bytes,
            sent: AtomicU64::new(0),
            percent,
            events,
        }
    }

    /// Account `n` more bytes handed to the transport
    pub fn advance(&self, n: u64) {
        let sent = self.sent.fetch_add(n, Ordering::SeqCst) + n;
        self.publish(percent_of(sent, self.total_bytes));
    }

    /// Mark the transfer complete
    pub fn finish(&self) {
        self.publish(100);
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst).min(self.total_bytes)
    }

    fn publish(&self, percent: u8) {
        let previous = self.percent.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.events.emit_lossy(PixgateEvent::UploadProgress {
                percent,
                bytes_sent: self.bytes_sent(),
                total_bytes: self.total_bytes,
                timestamp: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent_of(0, 8), 0);
        assert_eq!(percent_of(1, 8), 13); // 12.5
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(8, 8), 100);
        assert_eq!(percent_of(9, 8), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_tracker_emits_only_increases() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let cell = Arc::new(AtomicU8::new(0));
        let tracker = ProgressTracker::new(1000, cell.clone(), bus);

        tracker.advance(1); // rounds to 0, no event
        tracker.advance(499);
        tracker.advance(1); // still 50
        tracker.advance(500);
        tracker.finish(); // already 100

        let mut seen = Vec::new();
        while let Ok(PixgateEvent::UploadProgress { percent, .. }) = rx.try_recv() {
            seen.push(percent);
        }
        assert_eq!(seen, vec![50, 100]);
        assert_eq!(cell.load(Ordering::SeqCst), 100);
        assert_eq!(tracker.bytes_sent(), 1000);
    }
}
