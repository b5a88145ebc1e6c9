use std::sync::Arc;

use tokio::sync::RwLock;

use crate::ai::client::FeedbackAnalyzer;
use crate::ai::config::AiSettings;
use crate::backend::auth::{AuthProvider, SessionManager};
use crate::backend::data::ResumeRepository;
use crate::backend::storage::BlobStorage;
use crate::config::Config;
use crate::notifications::sink::NotificationSink;
use crate::pdf::TextExtractor;
use crate::persistence::local::LocalResumeCache;
use crate::persistence::session_cache::SessionFileCache;
use crate::retry::RetryPolicy;
use crate::store::AppStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// External collaborators are trait objects so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<RwLock<AppStore>>,
    pub sessions: Arc<SessionManager>,
    pub ai_settings: Arc<AiSettings>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn BlobStorage>,
    pub repo: Arc<dyn ResumeRepository>,
    pub analyzer: Arc<dyn FeedbackAnalyzer>,
    pub extractor: Arc<dyn TextExtractor>,
    pub sink: Arc<dyn NotificationSink>,
    pub local_cache: LocalResumeCache,
    pub file_cache: SessionFileCache,
}

impl AppState {
    /// Policy for callers that opt in to retrying AI requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_attempts(self.config.ai_retry_attempts)
    }
}
