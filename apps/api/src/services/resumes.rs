//! Résumé workflows: upload, analyze, delete, load.
//!
//! Each workflow calls the backend adapters before touching the in-memory
//! store. Notifications produced by store updates are dispatched after the
//! store lock is released.

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::config::AiConfig;
use crate::backend::data::DataError;
use crate::errors::AppError;
use crate::models::resume::{Feedback, JobContext, ResumeRecord, ResumeStatus};
use crate::notifications::sink::dispatch;
use crate::retry::retry_with_backoff;
use crate::state::AppState;
use crate::validation::{generate_uuid, sanitize_file_name, validate_resume_file, PDF_CONTENT_TYPE};

/// An uploaded file plus the questionnaire answers sent with it.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub display_name: Option<String>,
    pub job: JobContext,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadSource {
    Backend,
    LocalCache,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutcome {
    pub source: LoadSource,
    pub resumes: Vec<ResumeRecord>,
}

/// Validate, store the blob, cache a session copy, insert the row, then
/// update the store and local cache.
pub async fn upload_resume(
    state: &AppState,
    user_id: Uuid,
    request: UploadRequest,
) -> Result<ResumeRecord, AppError> {
    validate_resume_file(
        &request.file_name,
        &request.content_type,
        request.bytes.len() as u64,
    )?;

    state.store.write().await.set_uploading(true);
    let result = upload_inner(state, user_id, request).await;
    state.store.write().await.set_uploading(false);

    let record = result?;
    let events = state.store.write().await.upsert_resume(record.clone(), Utc::now());
    dispatch(state.sink.clone(), events);
    state.local_cache.save_latest(&record).await;

    info!("Uploaded résumé {} ({} bytes)", record.id, record.file_size);
    Ok(record)
}

async fn upload_inner(
    state: &AppState,
    user_id: Uuid,
    request: UploadRequest,
) -> Result<ResumeRecord, AppError> {
    let id = generate_uuid();
    let file_name = sanitize_file_name(&request.file_name);
    let file_path = format!("{user_id}/{id}/{file_name}");

    state
        .storage
        .upload(&file_path, request.bytes.clone(), PDF_CONTENT_TYPE)
        .await?;
    state.file_cache.store(&file_path, &request.bytes).await;

    let now = Utc::now();
    let name = request
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            file_name
                .strip_suffix(".pdf")
                .unwrap_or(&file_name)
                .to_string()
        });
    let record = ResumeRecord {
        id,
        user_id,
        name,
        file_name: file_name.clone(),
        file_path: file_path.clone(),
        image_path: None,
        file_size: request.bytes.len() as u64,
        status: ResumeStatus::Uploaded,
        feedback: None,
        job: request.job,
        uploaded_at: now,
        created_at: now,
        updated_at: now,
    };

    match state.repo.insert(&record).await {
        Ok(saved) => Ok(saved),
        Err(e) => {
            // The row never landed; drop the orphaned blob and session copy.
            if let Err(cleanup) = state.storage.delete(&file_path).await {
                warn!("Failed to remove orphaned upload {file_path}: {cleanup}");
            }
            state.file_cache.clear(&file_path).await;
            Err(e.into())
        }
    }
}

/// Runs one AI analysis for a stored résumé. With `retry`, retryable AI
/// failures are retried with backoff; otherwise exactly one request is made.
/// A failed analysis leaves the record in `error`.
pub async fn analyze_resume(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    retry: bool,
) -> Result<ResumeRecord, AppError> {
    let config = state
        .ai_settings
        .config()
        .filter(AiConfig::is_configured)
        .ok_or(AppError::AiNotConfigured)?;

    let record = state.repo.get(user_id, id).await?;
    let analyzing = state
        .repo
        .update_status(user_id, id, ResumeStatus::Analyzing)
        .await?;
    let events = {
        let mut store = state.store.write().await;
        store.set_analyzing(true);
        store.upsert_resume(analyzing, Utc::now())
    };
    dispatch(state.sink.clone(), events);

    let outcome = run_analysis(state, &config, &record, retry).await;

    let finished = match outcome {
        Ok(feedback) => state.repo.attach_feedback(user_id, id, &feedback).await,
        Err(e) => {
            warn!(
                "Analysis of résumé {id} failed [{}] {}: {e}",
                e.category().as_str(),
                e.code()
            );
            match state.repo.update_status(user_id, id, ResumeStatus::Error).await {
                Ok(failed) => {
                    finish_analysis(state, failed).await;
                }
                Err(status_err) => {
                    warn!("Could not mark résumé {id} as failed: {status_err}");
                    let mut failed = record.clone();
                    failed.mark_failed(Utc::now());
                    finish_analysis(state, failed).await;
                }
            }
            return Err(e);
        }
    };

    match finished {
        Ok(analyzed) => {
            finish_analysis(state, analyzed.clone()).await;
            info!(
                "Analyzed résumé {id}: {}/100",
                analyzed.score().unwrap_or_default()
            );
            Ok(analyzed)
        }
        Err(e) => {
            state.store.write().await.set_analyzing(false);
            Err(e.into())
        }
    }
}

async fn run_analysis(
    state: &AppState,
    config: &AiConfig,
    record: &ResumeRecord,
    retry: bool,
) -> Result<Feedback, AppError> {
    let bytes = fetch_document(state, &record.file_path).await?;
    let text = state.extractor.extract_text(bytes).await?;

    let feedback = if retry {
        let policy = state.retry_policy();
        retry_with_backoff(&policy, || {
            state.analyzer.analyze(config, &text, &record.job)
        })
        .await?
    } else {
        state.analyzer.analyze(config, &text, &record.job).await?
    };
    Ok(feedback)
}

/// Authoritative download first; the session copy only when that fails.
/// A failed download never touches the session copy.
async fn fetch_document(state: &AppState, path: &str) -> Result<Bytes, AppError> {
    match state.storage.download(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => match state.file_cache.retrieve(path).await {
            Some(cached) => {
                warn!("Download of {path} failed ({e}); using the session copy");
                Ok(cached.bytes)
            }
            None => Err(e.into()),
        },
    }
}

async fn finish_analysis(state: &AppState, record: ResumeRecord) {
    let events = {
        let mut store = state.store.write().await;
        store.set_analyzing(false);
        store.upsert_resume(record.clone(), Utc::now())
    };
    dispatch(state.sink.clone(), events);
    state.local_cache.save_latest(&record).await;
}

/// Deletes the row, then the blob and session copy (best effort), then the
/// in-memory and local copies.
pub async fn delete_resume(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    let record = state.repo.get(user_id, id).await?;
    state.repo.delete(user_id, id).await?;

    if let Err(e) = state.storage.delete(&record.file_path).await {
        warn!("Failed to delete stored file {}: {e}", record.file_path);
    }
    state.file_cache.clear(&record.file_path).await;

    let (_, events) = state.store.write().await.remove_resume(id, Utc::now());
    dispatch(state.sink.clone(), events);

    let cached = state.local_cache.load().await;
    if cached.iter().any(|r| r.id == id) {
        let remaining: Vec<_> = cached.into_iter().filter(|r| r.id != id).collect();
        if remaining.is_empty() {
            state.local_cache.clear().await;
        } else {
            state.local_cache.save(&remaining).await;
        }
    }

    info!("Deleted résumé {id}");
    Ok(())
}

/// Loads the user's résumés from the backend into the store. When the data
/// backend is unreachable, the local cache is used instead.
pub async fn load_resumes(state: &AppState, user_id: Uuid) -> Result<LoadOutcome, AppError> {
    state.store.write().await.set_loading(true);
    let result = state.repo.list_for_user(user_id).await;

    let (source, resumes) = match result {
        Ok(resumes) => (LoadSource::Backend, resumes),
        Err(DataError::Unavailable(reason)) => {
            warn!("Résumé backend unavailable ({reason}); falling back to local cache");
            let cached: Vec<_> = state
                .local_cache
                .load()
                .await
                .into_iter()
                .filter(|r| r.user_id == user_id)
                .collect();
            (LoadSource::LocalCache, cached)
        }
        Err(e) => {
            state.store.write().await.set_loading(false);
            return Err(e.into());
        }
    };

    let (events, resumes) = {
        let mut store = state.store.write().await;
        store.set_loading(false);
        if source == LoadSource::LocalCache {
            store.set_online(false);
        }
        let events = store.set_resumes(resumes, Utc::now());
        (events, store.resumes().to_vec())
    };
    dispatch(state.sink.clone(), events);

    info!("Loaded {} résumé(s) from {source:?}", resumes.len());
    Ok(LoadOutcome { source, resumes })
}
