use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::resume::ResumeRecord;
use crate::persistence::kv::KeyValueStore;

/// Fixed key holding the JSON array of cached résumé records.
pub const LOCAL_RESUMES_KEY: &str = "resume-coach.resumes";

/// Best-effort local copy of the résumé list. Never authoritative: every
/// failure is logged and swallowed.
#[derive(Clone)]
pub struct LocalResumeCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalResumeCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Missing key or unparseable content yields an empty list. Records whose
    /// status disagrees with their feedback are dropped.
    pub async fn load(&self) -> Vec<ResumeRecord> {
        let raw = match self.store.get(LOCAL_RESUMES_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read local résumé cache: {e:#}");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ResumeRecord>>(&raw) {
            Ok(mut records) => {
                let total = records.len();
                records.retain(ResumeRecord::is_consistent);
                if records.len() < total {
                    warn!(
                        "Dropped {} inconsistent résumé(s) from local cache",
                        total - records.len()
                    );
                }
                debug!("Loaded {} résumé(s) from local cache", records.len());
                records
            }
            Err(e) => {
                warn!("Discarding unparseable local résumé cache: {e}");
                Vec::new()
            }
        }
    }

    /// Overwrites the cached list.
    pub async fn save(&self, records: &[ResumeRecord]) {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize résumé cache: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(LOCAL_RESUMES_KEY, &json).await {
            warn!("Failed to write local résumé cache: {e:#}");
        }
    }

    /// Replaces the whole cache with `record` alone; only the newest upload is
    /// kept locally.
    pub async fn save_latest(&self, record: &ResumeRecord) {
        self.save(std::slice::from_ref(record)).await;
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(LOCAL_RESUMES_KEY).await {
            warn!("Failed to clear local résumé cache: {e:#}");
        }
    }
}
