use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{JobContext, ResumeRecord};
use crate::routes::middleware::CurrentUser;
use crate::services::resumes::{
    analyze_resume, delete_resume, load_resumes, upload_resume, LoadSource, UploadRequest,
};
use crate::state::AppState;
use crate::validation::{format_file_size, is_valid_uuid};

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Deserialize, Default)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub retry: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    #[serde(flatten)]
    pub resume: ResumeRecord,
    pub file_size_label: String,
}

impl From<ResumeRecord> for ResumeResponse {
    fn from(resume: ResumeRecord) -> Self {
        Self {
            file_size_label: format_file_size(resume.file_size),
            resume,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListResponse {
    pub resumes: Vec<ResumeResponse>,
    pub source: Option<LoadSource>,
    pub is_online: bool,
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    if !is_valid_uuid(raw) {
        return Err(AppError::Validation(format!("Invalid résumé id: {raw}")));
    }
    Uuid::parse_str(raw).map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let (resumes, source) = if params.refresh {
        let outcome = load_resumes(&state, user_id).await?;
        (outcome.resumes, Some(outcome.source))
    } else {
        let store = state.store.read().await;
        (store.resumes().to_vec(), None)
    };

    Ok(Json(ResumeListResponse {
        resumes: resumes
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .map(ResumeResponse::from)
            .collect(),
        source,
        is_online: state.store.read().await.is_online(),
    }))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ResumeResponse>, AppError> {
    let id = parse_id(&id)?;
    let cached = state
        .store
        .read()
        .await
        .resume(id)
        .filter(|r| r.user_id == user_id)
        .cloned();

    let resume = match cached {
        Some(resume) => resume,
        None => state.repo.get(user_id, id).await?,
    };
    Ok(Json(resume.into()))
}

/// POST /api/v1/resumes (multipart: file, name, companyName, jobTitle, jobDescription)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeResponse>), AppError> {
    let mut file = None;
    let mut display_name = None;
    let mut job = JobContext::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file upload: {e}")))?;
                file = Some((file_name, content_type, bytes));
            }
            "name" => display_name = text_field(field).await?,
            "companyName" => job.company_name = text_field(field).await?,
            "jobTitle" => job.job_title = text_field(field).await?,
            "jobDescription" => job.job_description = text_field(field).await?,
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("A résumé file is required".to_string()))?;

    let resume = upload_resume(
        &state,
        user_id,
        UploadRequest {
            file_name,
            content_type,
            bytes,
            display_name,
            job,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(resume.into())))
}

async fn text_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<Option<String>, AppError> {
    let text = field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
    let text = text.trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    delete_resume(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/:id/analyze
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(params): Query<AnalyzeQuery>,
) -> Result<Json<ResumeResponse>, AppError> {
    let id = parse_id(&id)?;
    let resume = analyze_resume(&state, user_id, id, params.retry).await?;
    Ok(Json(resume.into()))
}
