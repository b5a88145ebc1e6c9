pub mod detector;
pub mod feed;
pub mod sink;

use chrono::{DateTime, Utc};

use crate::models::notification::NotificationEvent;
use crate::models::resume::ResumeRecord;
use detector::{weekly_digest, ChangeDetector};
use feed::NotificationFeed;

/// Change detector plus the bounded feed it writes into.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    detector: ChangeDetector,
    feed: NotificationFeed,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            detector: ChangeDetector::new(),
            feed: NotificationFeed::new(),
        }
    }

    /// Whether a snapshot has been taken since the last reset.
    pub fn is_primed(&self) -> bool {
        self.detector.is_primed()
    }

    /// Runs one diff pass and inserts the emitted events at the head of the feed.
    pub fn observe(&mut self, records: &[ResumeRecord], now: DateTime<Utc>) -> Vec<NotificationEvent> {
        let events = self.detector.observe(records, &self.feed, now);
        self.feed.push_all(&events);
        events
    }

    pub fn check_weekly_digest(
        &mut self,
        records: &[ResumeRecord],
        now: DateTime<Utc>,
    ) -> Option<NotificationEvent> {
        let digest = weekly_digest(records, &self.feed, now)?;
        self.feed.push(digest.clone());
        Some(digest)
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut NotificationFeed {
        &mut self.feed
    }

    /// Drops the feed and the snapshot.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.feed.clear();
    }
}
