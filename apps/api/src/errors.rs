use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::ai::client::AiError;
use crate::backend::auth::AuthError;
use crate::backend::data::DataError;
use crate::backend::storage::StorageError;
use crate::retry::Retryable;
use crate::validation::FileValidationError;

/// Fixed error taxonomy surfaced to clients alongside a machine code.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Authentication,
    FileUpload,
    AiAnalysis,
    DataStorage,
    Network,
    Validation,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::FileUpload => "file_upload",
            ErrorCategory::AiAnalysis => "ai_analysis",
            ErrorCategory::DataStorage => "data_storage",
            ErrorCategory::Network => "network",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Keyword heuristic for errors that arrive untyped (`anyhow`).
    /// Typed adapter errors never go through this.
    pub fn from_message(message: &str) -> Self {
        let text = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["unauthorized", "auth", "login", "session", "jwt", "credential"]) {
            ErrorCategory::Authentication
        } else if has(&["network", "timeout", "timed out", "connection", "offline", "dns"]) {
            ErrorCategory::Network
        } else if has(&["upload", "pdf", "file"]) {
            ErrorCategory::FileUpload
        } else if has(&["openai", "anthropic", "gemini", "analysis", "llm", "model"]) {
            ErrorCategory::AiAnalysis
        } else if has(&["database", "storage", "quota", "redis", "query", "row"]) {
            ErrorCategory::DataStorage
        } else if has(&["invalid", "validation", "required", "missing"]) {
            ErrorCategory::Validation
        } else {
            ErrorCategory::Unknown
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::FileUpload | ErrorCategory::AiAnalysis => StatusCode::BAD_GATEWAY,
            ErrorCategory::DataStorage | ErrorCategory::Network => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_user_message(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Please sign in again to continue.",
            ErrorCategory::FileUpload => "We couldn't process your file. Please try again.",
            ErrorCategory::AiAnalysis => {
                "The AI analysis failed. Check your AI settings or try again later."
            }
            ErrorCategory::DataStorage => "We couldn't save or load your data right now.",
            ErrorCategory::Network => "Network problem. Check your connection and try again.",
            ErrorCategory::Validation => "Some of the provided information is invalid.",
            ErrorCategory::Unknown => "Something went wrong. Please try again.",
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid file: {0}")]
    InvalidFile(#[from] FileValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("AI provider is not configured")]
    AiNotConfigured,

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation(_) | AppError::InvalidFile(_) => ErrorCategory::Validation,
            AppError::NotFound(_) => ErrorCategory::DataStorage,
            AppError::Unauthorized => ErrorCategory::Authentication,
            AppError::AiNotConfigured => ErrorCategory::AiAnalysis,
            AppError::Auth(e) => e.category(),
            AppError::Storage(e) => e.category(),
            AppError::Data(e) => e.category(),
            AppError::Ai(e) => e.category(),
            AppError::Internal(e) => ErrorCategory::from_message(&format!("{e:#}")),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidFile(_) => "INVALID_FILE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::AiNotConfigured => "AI_NOT_CONFIGURED",
            AppError::Auth(e) => e.code(),
            AppError::Storage(e) => e.code(),
            AppError::Data(e) => e.code(),
            AppError::Ai(e) => e.code(),
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show an end user; distinct from the internal `Display`.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::InvalidFile(e) => e.to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized => "Please sign in to continue.".to_string(),
            AppError::AiNotConfigured => {
                "Configure an AI provider in settings before analyzing résumés.".to_string()
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                "Invalid email or password.".to_string()
            }
            AppError::Storage(StorageError::QuotaExceeded(_)) => {
                "Storage quota exceeded. Delete older résumés and try again.".to_string()
            }
            AppError::Storage(StorageError::PermissionDenied(_)) => {
                "You don't have permission to access this file.".to_string()
            }
            other => other.category().default_user_message().to_string(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AiNotConfigured => StatusCode::PRECONDITION_FAILED,
            AppError::Data(DataError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Data(DataError::Constraint(_)) => StatusCode::CONFLICT,
            AppError::Storage(StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Storage(StorageError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            AppError::Storage(StorageError::QuotaExceeded(_)) => StatusCode::INSUFFICIENT_STORAGE,
            AppError::Ai(AiError::Parse(_)) | AppError::Ai(AiError::EmptyContent) => {
                StatusCode::BAD_GATEWAY
            }
            other => other.category().status(),
        }
    }
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        match self {
            AppError::Auth(e) => e.is_retryable(),
            AppError::Storage(e) => e.is_retryable(),
            AppError::Data(e) => e.is_retryable(),
            AppError::Ai(e) => e.is_retryable(),
            AppError::Internal(_) => self.category() == ErrorCategory::Network,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let category = self.category();
        let code = self.code();
        let status = self.status();
        let retryable = self.is_retryable();

        if status.is_server_error() {
            tracing::error!(category = category.as_str(), code, retryable, "{self:?}");
        } else {
            tracing::warn!(category = category.as_str(), code, "{self}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "category": category,
                "message": self.user_message(),
                "retryable": retryable
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_categorization() {
        assert_eq!(
            ErrorCategory::from_message("JWT expired"),
            ErrorCategory::Authentication
        );
        assert_eq!(
            ErrorCategory::from_message("connection reset by peer"),
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorCategory::from_message("failed to read PDF"),
            ErrorCategory::FileUpload
        );
        assert_eq!(
            ErrorCategory::from_message("OpenAI returned 500"),
            ErrorCategory::AiAnalysis
        );
        assert_eq!(
            ErrorCategory::from_message("storage quota exceeded"),
            ErrorCategory::DataStorage
        );
        assert_eq!(
            ErrorCategory::from_message("invalid input"),
            ErrorCategory::Validation
        );
        assert_eq!(ErrorCategory::from_message("boom"), ErrorCategory::Unknown);
    }

    #[test]
    fn test_file_validation_is_not_retryable() {
        let err = AppError::from(FileValidationError::NotPdf);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.code(), "INVALID_FILE");
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Only PDF files are allowed");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_quota_and_permission_are_not_retryable() {
        let quota = AppError::from(StorageError::QuotaExceeded("bucket full".into()));
        let denied = AppError::from(StorageError::PermissionDenied("nope".into()));
        assert!(!quota.is_retryable());
        assert!(!denied.is_retryable());
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_network_errors_are_retryable() {
        let offline = AppError::from(StorageError::Unavailable("connection reset".into()));
        assert!(offline.is_retryable());
        assert_eq!(offline.category(), ErrorCategory::Network);
        assert!(AppError::Internal(anyhow::anyhow!("connection refused")).is_retryable());
        assert!(!AppError::Internal(anyhow::anyhow!("boom")).is_retryable());
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let err = AppError::Internal(anyhow::anyhow!("secret stack detail"));
        assert!(!err.user_message().contains("secret"));
        assert!(err.to_string().contains("secret"));
    }

    #[test]
    fn test_not_configured_maps_to_precondition_failed() {
        let err = AppError::AiNotConfigured;
        assert_eq!(err.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(err.category(), ErrorCategory::AiAnalysis);
        assert_eq!(err.code(), "AI_NOT_CONFIGURED");
    }
}
