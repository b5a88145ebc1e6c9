use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::notification::NotificationEvent;
use crate::models::resume::ResumeRecord;
use crate::notifications::feed::NotificationFeed;
use crate::notifications::NotificationCenter;

/// In-memory application state for the one active session.
///
/// The résumé list only changes through the setters below. Each list mutation
/// runs the change detector before returning, and hands back the events it
/// emitted so the caller can dispatch them after releasing the lock.
#[derive(Debug)]
pub struct AppStore {
    resumes: Vec<ResumeRecord>,
    is_loading: bool,
    is_uploading: bool,
    is_analyzing: bool,
    online: bool,
    session_user: Option<Uuid>,
    ai_config_loaded_for: Option<Uuid>,
    notifications: NotificationCenter,
}

impl Default for AppStore {
    fn default() -> Self {
        Self {
            resumes: Vec::new(),
            is_loading: false,
            is_uploading: false,
            is_analyzing: false,
            online: true,
            session_user: None,
            ai_config_loaded_for: None,
            notifications: NotificationCenter::new(),
        }
    }
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- selectors ---

    /// Newest first.
    pub fn resumes(&self) -> &[ResumeRecord] {
        &self.resumes
    }

    pub fn resume(&self, id: Uuid) -> Option<&ResumeRecord> {
        self.resumes.iter().find(|r| r.id == id)
    }

    /// Most recently created résumé, scored or not.
    pub fn latest(&self) -> Option<&ResumeRecord> {
        self.resumes.iter().max_by_key(|r| r.created_at)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_uploading(&self) -> bool {
        self.is_uploading
    }

    pub fn is_analyzing(&self) -> bool {
        self.is_analyzing
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// User whose data the store currently holds.
    pub fn session_user(&self) -> Option<Uuid> {
        self.session_user
    }

    pub fn ai_config_loaded_for(&self) -> Option<Uuid> {
        self.ai_config_loaded_for
    }

    /// Whether the change detector holds a snapshot.
    pub fn is_primed(&self) -> bool {
        self.notifications.is_primed()
    }

    pub fn feed(&self) -> &NotificationFeed {
        self.notifications.feed()
    }

    pub fn feed_mut(&mut self) -> &mut NotificationFeed {
        self.notifications.feed_mut()
    }

    // --- list mutators ---

    pub fn set_resumes(
        &mut self,
        mut resumes: Vec<ResumeRecord>,
        now: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        resumes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.resumes = resumes;
        self.observe(now)
    }

    /// Replaces the record with the same id, or inserts it at the head.
    pub fn upsert_resume(
        &mut self,
        record: ResumeRecord,
        now: DateTime<Utc>,
    ) -> Vec<NotificationEvent> {
        match self.resumes.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.resumes.insert(0, record),
        }
        self.observe(now)
    }

    pub fn remove_resume(
        &mut self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> (Option<ResumeRecord>, Vec<NotificationEvent>) {
        let Some(index) = self.resumes.iter().position(|r| r.id == id) else {
            return (None, Vec::new());
        };
        let removed = self.resumes.remove(index);
        (Some(removed), self.observe(now))
    }

    /// Back to a signed-out state: no résumés, no feed, detector unprimed.
    pub fn clear(&mut self) {
        self.resumes.clear();
        self.is_loading = false;
        self.is_uploading = false;
        self.is_analyzing = false;
        self.session_user = None;
        self.ai_config_loaded_for = None;
        self.notifications.reset();
    }

    // --- flags ---

    pub fn set_loading(&mut self, value: bool) {
        self.is_loading = value;
    }

    pub fn set_uploading(&mut self, value: bool) {
        self.is_uploading = value;
    }

    pub fn set_analyzing(&mut self, value: bool) {
        self.is_analyzing = value;
    }

    /// Returns true when the value changed.
    pub fn set_online(&mut self, value: bool) -> bool {
        std::mem::replace(&mut self.online, value) != value
    }

    pub fn set_session_user(&mut self, user_id: Option<Uuid>) {
        self.session_user = user_id;
    }

    pub fn set_ai_config_loaded_for(&mut self, user_id: Option<Uuid>) {
        self.ai_config_loaded_for = user_id;
    }

    // --- notifications ---

    pub fn check_weekly_digest(&mut self, now: DateTime<Utc>) -> Option<NotificationEvent> {
        self.notifications.check_weekly_digest(&self.resumes, now)
    }

    fn observe(&mut self, now: DateTime<Utc>) -> Vec<NotificationEvent> {
        self.notifications.observe(&self.resumes, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;
    use crate::models::resume::fixtures::{feedback, record_at};
    use chrono::Duration;

    #[test]
    fn test_first_load_primes_without_events() {
        let mut store = AppStore::new();
        let now = Utc::now();
        let events = store.set_resumes(vec![record_at(Uuid::new_v4(), Some(95.0), now)], now);
        assert!(events.is_empty());
        assert_eq!(store.resumes().len(), 1);
    }

    #[test]
    fn test_upsert_inserts_at_head_and_emits() {
        let mut store = AppStore::new();
        let now = Utc::now();
        let older = record_at(Uuid::new_v4(), Some(60.0), now - Duration::days(1));
        store.set_resumes(vec![older.clone()], now);

        let newer = record_at(Uuid::new_v4(), Some(85.0), now);
        let events = store.upsert_resume(newer.clone(), now);

        assert_eq!(store.resumes()[0].id, newer.id);
        assert_eq!(store.latest().map(|r| r.id), Some(newer.id));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, NotificationKind::NewAnalysis);
        assert_eq!(store.feed().len(), 2);
    }

    #[test]
    fn test_upsert_replaces_existing_record() {
        let mut store = AppStore::new();
        let now = Utc::now();
        let mut record = record_at(Uuid::new_v4(), None, now - Duration::hours(1));
        store.set_resumes(vec![record.clone()], now);

        record.mark_analyzed(feedback(72.0), now);
        let events = store.upsert_resume(record.clone(), now);

        assert_eq!(store.resumes().len(), 1);
        assert_eq!(store.resume(record.id).and_then(|r| r.score()), Some(72.0));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_remove_returns_record() {
        let mut store = AppStore::new();
        let now = Utc::now();
        let record = record_at(Uuid::new_v4(), Some(70.0), now);
        store.set_resumes(vec![record.clone()], now);

        let (removed, events) = store.remove_resume(record.id, now);
        assert_eq!(removed.map(|r| r.id), Some(record.id));
        assert!(events.is_empty());
        assert!(store.resumes().is_empty());
        assert!(store.remove_resume(record.id, now).0.is_none());
    }

    #[test]
    fn test_clear_keeps_connectivity_only() {
        let mut store = AppStore::new();
        let now = Utc::now();
        store.set_resumes(vec![], now);
        store.upsert_resume(record_at(Uuid::new_v4(), Some(99.0), now), now);
        store.set_uploading(true);
        store.set_online(false);
        store.set_session_user(Some(Uuid::new_v4()));
        store.set_ai_config_loaded_for(Some(Uuid::new_v4()));
        assert!(store.is_primed());

        store.clear();
        assert!(!store.is_primed());
        assert!(store.session_user().is_none());
        assert!(store.resumes().is_empty());
        assert!(store.feed().is_empty());
        assert!(!store.is_uploading());
        assert!(!store.is_online());
        assert!(store.ai_config_loaded_for().is_none());

        // Unprimed again: the next load is silent.
        let events = store.set_resumes(vec![record_at(Uuid::new_v4(), Some(99.0), now)], now);
        assert!(events.is_empty());
    }

    #[test]
    fn test_set_online_reports_transitions() {
        let mut store = AppStore::new();
        assert!(!store.set_online(true));
        assert!(store.set_online(false));
        assert!(!store.set_online(false));
    }
}
