use axum::{extract::State, Extension, Json};
use serde::Serialize;
use tracing::info;

use crate::ai::config::{AiConfig, AiProvider};
use crate::errors::AppError;
use crate::routes::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettingsResponse {
    pub configured: bool,
    pub config: Option<AiConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiStatusResponse {
    pub configured: bool,
    pub provider: Option<AiProvider>,
    pub model: Option<String>,
}

fn settings_response(config: Option<AiConfig>) -> AiSettingsResponse {
    AiSettingsResponse {
        configured: config.as_ref().is_some_and(AiConfig::is_configured),
        config: config.map(|c| c.redacted()),
    }
}

/// GET /api/v1/settings/ai
pub async fn handle_get_ai_settings(State(state): State<AppState>) -> Json<AiSettingsResponse> {
    Json(settings_response(state.ai_settings.config()))
}

/// PUT /api/v1/settings/ai
///
/// A key still in its redacted `****` form keeps the stored key.
pub async fn handle_put_ai_settings(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(mut config): Json<AiConfig>,
) -> Result<Json<AiSettingsResponse>, AppError> {
    if config.provider.is_none() {
        return Err(AppError::Validation("An AI provider is required".to_string()));
    }
    if config.api_key.starts_with("****") {
        config.api_key = state
            .ai_settings
            .config()
            .map(|c| c.api_key)
            .unwrap_or_default();
    }
    if let Some(t) = config.temperature {
        if !(0.0..=2.0).contains(&t) {
            return Err(AppError::Validation(
                "Temperature must be between 0 and 2".to_string(),
            ));
        }
    }

    state.repo.upsert_ai_config(user_id, &config).await?;
    info!(
        "Saved AI configuration for {user_id} (provider: {})",
        config.provider.map(|p| p.as_str()).unwrap_or("none")
    );
    state.ai_settings.set_config(config.clone());
    state
        .store
        .write()
        .await
        .set_ai_config_loaded_for(Some(user_id));

    Ok(Json(settings_response(Some(config))))
}

/// GET /api/v1/settings/ai/status
pub async fn handle_ai_status(State(state): State<AppState>) -> Json<AiStatusResponse> {
    let config = state.ai_settings.config();
    Json(AiStatusResponse {
        configured: state.ai_settings.is_configured(),
        provider: config.as_ref().and_then(|c| c.provider),
        model: config.as_ref().and_then(|c| c.model()).map(str::to_string),
    })
}
