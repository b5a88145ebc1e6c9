use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::models::notification::{NotificationEvent, NotificationKind};

/// Maximum number of notifications retained; the oldest are dropped first.
pub const MAX_NOTIFICATIONS: usize = 50;

/// Newest-first, bounded notification list.
#[derive(Debug, Default, Clone)]
pub struct NotificationFeed {
    items: VecDeque<NotificationEvent>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `events` at the head, preserving their relative order.
    pub fn push_all(&mut self, events: &[NotificationEvent]) {
        for event in events.iter().rev() {
            self.items.push_front(event.clone());
        }
        self.items.truncate(MAX_NOTIFICATIONS);
    }

    pub fn push(&mut self, event: NotificationEvent) {
        self.items.push_front(event);
        self.items.truncate(MAX_NOTIFICATIONS);
    }

    pub fn items(&self) -> impl Iterator<Item = &NotificationEvent> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<NotificationEvent> {
        self.items().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items().filter(|n| !n.is_read).count()
    }

    /// Returns false when no notification has this id.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for n in self.items.iter_mut() {
            n.is_read = true;
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Whether a notification of `kind` titled `title` exists at or after `now - window`.
    pub fn has_recent(
        &self,
        kind: NotificationKind,
        title: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let cutoff = now - window;
        self.items
            .iter()
            .any(|n| n.kind == kind && n.title == title && n.timestamp >= cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationPriority;

    fn event(title: &str, at: DateTime<Utc>) -> NotificationEvent {
        NotificationEvent::new(
            NotificationKind::Milestone,
            NotificationPriority::Low,
            title,
            "message",
            None,
            at,
        )
    }

    #[test]
    fn test_feed_never_exceeds_cap() {
        let mut feed = NotificationFeed::new();
        let now = Utc::now();
        for i in 0..120 {
            feed.push(event(&format!("n{i}"), now));
        }
        assert_eq!(feed.len(), MAX_NOTIFICATIONS);
        assert_eq!(feed.items().next().unwrap().title, "n119");
        assert_eq!(feed.items().last().unwrap().title, "n70");
    }

    #[test]
    fn test_push_all_keeps_batch_order_at_head() {
        let mut feed = NotificationFeed::new();
        let now = Utc::now();
        feed.push(event("old", now));
        feed.push_all(&[event("first", now), event("second", now)]);
        let titles: Vec<_> = feed.items().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "old"]);

        let batch: Vec<_> = (0..60).map(|i| event(&format!("b{i}"), now)).collect();
        feed.push_all(&batch);
        assert_eq!(feed.len(), MAX_NOTIFICATIONS);
        assert_eq!(feed.items().next().unwrap().title, "b0");
    }

    #[test]
    fn test_read_state_and_removal() {
        let mut feed = NotificationFeed::new();
        let now = Utc::now();
        let a = event("a", now);
        let b = event("b", now);
        let a_id = a.id.clone();
        let b_id = b.id.clone();
        feed.push(a);
        feed.push(b);
        assert_eq!(feed.unread_count(), 2);

        assert!(feed.mark_read(&a_id));
        assert!(!feed.mark_read("missing"));
        assert_eq!(feed.unread_count(), 1);

        assert!(feed.remove(&b_id));
        assert!(!feed.remove(&b_id));
        assert_eq!(feed.len(), 1);

        feed.mark_all_read();
        assert_eq!(feed.unread_count(), 0);
        feed.clear();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_has_recent_respects_window() {
        let mut feed = NotificationFeed::new();
        let now = Utc::now();
        feed.push(event("Weekly Summary", now - Duration::days(8)));
        assert!(!feed.has_recent(
            NotificationKind::Milestone,
            "Weekly Summary",
            Duration::days(7),
            now
        ));
        feed.push(event("Weekly Summary", now - Duration::days(2)));
        assert!(feed.has_recent(
            NotificationKind::Milestone,
            "Weekly Summary",
            Duration::days(7),
            now
        ));
    }
}
