//! In-memory wiring of `AppState` for tests.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ai::client::testing::ScriptedAnalyzer;
use crate::ai::config::{AiConfig, AiProvider, AiSettings};
use crate::backend::auth::testing::FakeAuth;
use crate::backend::auth::SessionManager;
use crate::backend::data::testing::MemoryResumeRepository;
use crate::backend::storage::testing::MemoryBlobStorage;
use crate::config::Config;
use crate::notifications::sink::testing::RecordingSink;
use crate::pdf::testing::PlainTextExtractor;
use crate::persistence::kv::MemoryStore;
use crate::persistence::local::LocalResumeCache;
use crate::persistence::session_cache::SessionFileCache;
use crate::services::session::on_signed_in;
use crate::state::AppState;
use crate::store::AppStore;

pub fn test_ai_config() -> AiConfig {
    AiConfig {
        provider: Some(AiProvider::OpenAi),
        api_key: "sk-test-1234".to_string(),
        ..AiConfig::default()
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub user_id: Uuid,
    pub auth: Arc<FakeAuth>,
    pub repo: Arc<MemoryResumeRepository>,
    pub storage: Arc<MemoryBlobStorage>,
    pub analyzer: Arc<ScriptedAnalyzer>,
    pub sink: Arc<RecordingSink>,
    pub local_store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Signed out, no AI configuration.
    pub fn new() -> Self {
        Self::with_analyzer(ScriptedAnalyzer::scoring(92.0))
    }

    pub fn with_analyzer(analyzer: ScriptedAnalyzer) -> Self {
        let auth = Arc::new(FakeAuth::new());
        let repo = Arc::new(MemoryResumeRepository::default());
        let storage = Arc::new(MemoryBlobStorage::default());
        let analyzer = Arc::new(analyzer);
        let sink = Arc::new(RecordingSink::default());
        let local_store = Arc::new(MemoryStore::new());

        let state = AppState {
            config: Config::for_tests(),
            store: Arc::new(RwLock::new(AppStore::new())),
            sessions: Arc::new(SessionManager::new()),
            ai_settings: Arc::new(AiSettings::new()),
            auth: auth.clone(),
            storage: storage.clone(),
            repo: repo.clone(),
            analyzer: analyzer.clone(),
            extractor: Arc::new(PlainTextExtractor),
            sink: sink.clone(),
            local_cache: LocalResumeCache::new(local_store.clone()),
            file_cache: SessionFileCache::new(Arc::new(MemoryStore::new())),
        };

        Self {
            state,
            user_id: auth.user_id,
            auth,
            repo,
            storage,
            analyzer,
            sink,
            local_store,
        }
    }

    pub async fn signed_in() -> Self {
        let h = Self::new();
        h.sign_in().await;
        h
    }

    /// Signed in with a stored AI configuration; analyses score 92.
    pub async fn configured() -> Self {
        Self::configured_with(ScriptedAnalyzer::scoring(92.0)).await
    }

    pub async fn configured_with(analyzer: ScriptedAnalyzer) -> Self {
        let h = Self::with_analyzer(analyzer);
        h.repo
            .configs
            .lock()
            .unwrap()
            .insert(h.user_id, test_ai_config());
        h.sign_in().await;
        h
    }

    pub async fn sign_in(&self) {
        let session = self.auth.session();
        self.state.sessions.sign_in(session.clone());
        on_signed_in(&self.state, &session).await.unwrap();
    }
}
