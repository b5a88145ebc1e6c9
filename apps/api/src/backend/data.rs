use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::ai::config::AiConfig;
use crate::errors::ErrorCategory;
use crate::models::resume::{Feedback, JobContext, ResumeRecord, ResumeStatus};
use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("row not found")]
    NotFound,

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Query(String),

    #[error("failed to encode analysis: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DataError::NotFound,
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                DataError::Constraint(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::Unavailable(err.to_string())
            }
            _ => DataError::Query(err.to_string()),
        }
    }
}

impl DataError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DataError::Unavailable(_) => ErrorCategory::Network,
            _ => ErrorCategory::DataStorage,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            DataError::NotFound => "RESUME_NOT_FOUND",
            DataError::Constraint(_) => "CONSTRAINT_VIOLATION",
            DataError::Unavailable(_) => "DATABASE_UNAVAILABLE",
            DataError::Query(_) | DataError::Encode(_) => "DATABASE_ERROR",
        }
    }
}

impl Retryable for DataError {
    fn is_retryable(&self) -> bool {
        matches!(self, DataError::Unavailable(_))
    }
}

/// Résumé rows and the per-user AI configuration row. Every update sets
/// `updated_at` server-side; change detection depends on it.
#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>, DataError>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<ResumeRecord, DataError>;

    async fn insert(&self, record: &ResumeRecord) -> Result<ResumeRecord, DataError>;

    async fn update_status(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: ResumeStatus,
    ) -> Result<ResumeRecord, DataError>;

    async fn attach_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: &Feedback,
    ) -> Result<ResumeRecord, DataError>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DataError>;

    async fn get_ai_config(&self, user_id: Uuid) -> Result<Option<AiConfig>, DataError>;

    async fn upsert_ai_config(&self, user_id: Uuid, config: &AiConfig) -> Result<(), DataError>;

    async fn ping(&self) -> Result<(), DataError>;
}

#[derive(Debug, Clone, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub file_name: String,
    pub file_path: String,
    pub image_path: Option<String>,
    pub file_size: i64,
    pub status: String,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub analysis: Option<Value>,
    pub uploaded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResumeRow> for ResumeRecord {
    fn from(row: ResumeRow) -> Self {
        let feedback = row.analysis.and_then(|value| {
            serde_json::from_value::<Feedback>(value)
                .map_err(|e| warn!("Discarding unreadable analysis for résumé {}: {e}", row.id))
                .ok()
        });
        let mut status = ResumeStatus::parse(&row.status);
        // Keep `analyzed` and feedback in lockstep.
        if status == ResumeStatus::Analyzed && feedback.is_none() {
            status = ResumeStatus::Error;
        }

        ResumeRecord {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            file_name: row.file_name,
            file_path: row.file_path,
            image_path: row.image_path,
            file_size: u64::try_from(row.file_size).unwrap_or_default(),
            status,
            feedback: if status == ResumeStatus::Analyzed {
                feedback
            } else {
                None
            },
            job: JobContext {
                company_name: row.company_name,
                job_title: row.job_title,
                job_description: row.job_description,
            },
            uploaded_at: row.uploaded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AiConfigRow {
    provider: Option<String>,
    api_key: String,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<i32>,
}

impl From<AiConfigRow> for AiConfig {
    fn from(row: AiConfigRow) -> Self {
        AiConfig {
            provider: row.provider.and_then(|p| p.parse().ok()),
            api_key: row.api_key,
            base_url: row.base_url,
            model: row.model,
            temperature: row.temperature,
            max_tokens: row.max_tokens.and_then(|t| u32::try_from(t).ok()),
        }
    }
}

#[derive(Clone)]
pub struct PgResumeRepository {
    pool: PgPool,
}

impl PgResumeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeRepository for PgResumeRepository {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>, DataError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ResumeRecord::from).collect())
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<ResumeRecord, DataError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert(&self, record: &ResumeRecord) -> Result<ResumeRecord, DataError> {
        let analysis = record
            .feedback
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes
                (id, user_id, name, file_name, file_path, image_path, file_size, status,
                 company_name, job_title, job_description, analysis, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.name)
        .bind(&record.file_name)
        .bind(&record.file_path)
        .bind(&record.image_path)
        .bind(i64::try_from(record.file_size).unwrap_or(i64::MAX))
        .bind(record.status.as_str())
        .bind(&record.job.company_name)
        .bind(&record.job.job_title)
        .bind(&record.job.job_description)
        .bind(analysis)
        .bind(record.uploaded_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_status(
        &self,
        user_id: Uuid,
        id: Uuid,
        status: ResumeStatus,
    ) -> Result<ResumeRecord, DataError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resumes
            SET status = $3, analysis = NULL, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn attach_feedback(
        &self,
        user_id: Uuid,
        id: Uuid,
        feedback: &Feedback,
    ) -> Result<ResumeRecord, DataError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            UPDATE resumes
            SET status = 'analyzed', analysis = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(serde_json::to_value(feedback)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DataError> {
        let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DataError::NotFound);
        }
        Ok(())
    }

    async fn get_ai_config(&self, user_id: Uuid) -> Result<Option<AiConfig>, DataError> {
        let row = sqlx::query_as::<_, AiConfigRow>(
            r#"
            SELECT provider, api_key, base_url, model, temperature, max_tokens
            FROM ai_configs WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AiConfig::from))
    }

    async fn upsert_ai_config(&self, user_id: Uuid, config: &AiConfig) -> Result<(), DataError> {
        sqlx::query(
            r#"
            INSERT INTO ai_configs
                (user_id, provider, api_key, base_url, model, temperature, max_tokens)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                api_key = EXCLUDED.api_key,
                base_url = EXCLUDED.base_url,
                model = EXCLUDED.model,
                temperature = EXCLUDED.temperature,
                max_tokens = EXCLUDED.max_tokens,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(config.provider.map(|p| p.as_str()))
        .bind(&config.api_key)
        .bind(&config.base_url)
        .bind(&config.model)
        .bind(config.temperature)
        .bind(config.max_tokens.map(|t| i32::try_from(t).unwrap_or(i32::MAX)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), DataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
