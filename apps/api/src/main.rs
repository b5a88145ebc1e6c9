mod ai;
mod backend;
mod config;
mod dashboard;
mod db;
mod errors;
mod models;
mod notifications;
mod pdf;
mod persistence;
mod retry;
mod routes;
mod services;
mod state;
mod store;
mod tasks;
#[cfg(test)]
mod testing;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::client::HttpFeedbackAnalyzer;
use crate::ai::config::AiSettings;
use crate::backend::auth::{HostedAuthClient, SessionManager};
use crate::backend::data::PgResumeRepository;
use crate::backend::storage::S3BlobStorage;
use crate::config::Config;
use crate::db::create_pool;
use crate::notifications::sink::{FanoutSink, LogSink, NotificationSink, WebhookSink};
use crate::pdf::PdfTextExtractor;
use crate::persistence::kv::{FileStore, KeyValueStore, MemoryStore, RedisStore};
use crate::persistence::local::LocalResumeCache;
use crate::persistence::session_cache::SessionFileCache;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::AppStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Résumé Coach API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis session file cache
    let redis = redis::Client::open(config.redis_url.clone())?;
    let file_cache = SessionFileCache::new(Arc::new(RedisStore::new(
        redis,
        "resume-coach:session",
    )));
    // Initialize local résumé cache
    let local_store: Arc<dyn KeyValueStore> =
        match FileStore::open(config.local_cache_dir.clone()).await {
            Ok(store) => {
                info!("Local cache at {}", config.local_cache_dir.display());
                Arc::new(store)
            }
            Err(e) => {
                warn!("Local cache directory unavailable, keeping cache in memory: {e:#}");
                Arc::new(MemoryStore::new())
            }
        };
    let local_cache = LocalResumeCache::new(local_store);

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Shared HTTP client
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()?;

    // Build app state
    let state = AppState {
        config: config.clone(),
        store: Arc::new(RwLock::new(AppStore::new())),
        sessions: Arc::new(SessionManager::new()),
        ai_settings: Arc::new(AiSettings::new()),
        auth: Arc::new(HostedAuthClient::new(
            http.clone(),
            &config.auth_url,
            config.auth_anon_key.clone(),
        )),
        storage: Arc::new(S3BlobStorage::new(s3, config.s3_bucket.clone())),
        repo: Arc::new(PgResumeRepository::new(db)),
        analyzer: Arc::new(HttpFeedbackAnalyzer::new(http.clone())),
        extractor: Arc::new(PdfTextExtractor),
        sink: build_sink(&config, http),
        local_cache,
        file_cache,
    };

    // Start background tasks
    let background = tasks::spawn_all(&state);
    info!("Started {} background task(s)", background.len());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log delivery always; the webhook only with notification permission and a URL.
fn build_sink(config: &Config, http: reqwest::Client) -> Arc<dyn NotificationSink> {
    match (&config.notification_webhook_url, config.desktop_notifications) {
        (Some(url), true) => {
            info!("Delivering notifications to webhook {url}");
            let sinks: Vec<Arc<dyn NotificationSink>> = vec![
                Arc::new(LogSink),
                Arc::new(WebhookSink::new(http, url.clone())),
            ];
            Arc::new(FanoutSink::new(sinks))
        }
        _ => Arc::new(LogSink),
    }
}

/// S3 client for MinIO locally or AWS in production.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-coach-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
