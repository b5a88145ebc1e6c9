use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::auth::{AuthError, AuthSession, AuthUser};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Client-facing view of the session; tokens stay server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: AuthUser,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&AuthSession> for SessionResponse {
    fn from(session: &AuthSession) -> Self {
        Self {
            user: session.user.clone(),
            expires_at: session.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct OAuthResponse {
    pub url: String,
}

/// Tokens handed back by the hosted auth provider after an OAuth redirect.
#[derive(Deserialize)]
pub struct OAuthCallback {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let session = state.auth.sign_in_with_password(email, &req.password).await?;
    let response = SessionResponse::from(&session);
    info!("User {} signed in", session.user.id);
    state.sessions.sign_in(session);
    Ok(Json(response))
}

/// GET /api/v1/auth/oauth/:provider
pub async fn handle_oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Json<OAuthResponse>, AppError> {
    let url = state
        .auth
        .oauth_authorize_url(&provider, &state.config.oauth_redirect_url())?;
    Ok(Json(OAuthResponse { url }))
}

/// GET /api/v1/auth/callback
pub async fn handle_oauth_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state.auth.get_user(&params.access_token).await?;
    let session = AuthSession {
        access_token: params.access_token,
        refresh_token: params.refresh_token,
        expires_at: params
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs)),
        user,
    };

    let response = SessionResponse::from(&session);
    info!("User {} signed in via OAuth", session.user.id);
    state.sessions.sign_in(session);
    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let current = state.sessions.current().ok_or(AppError::Unauthorized)?;
    let refresh_token = current
        .refresh_token
        .as_deref()
        .ok_or(AppError::Unauthorized)?;

    let session = match state.auth.refresh_session(refresh_token).await {
        Ok(session) => session,
        Err(e) => {
            // A rejected refresh token ends the session.
            if matches!(e, AuthError::SessionExpired) {
                state.sessions.sign_out();
            }
            return Err(e.into());
        }
    };

    let response = SessionResponse::from(&session);
    state.sessions.refresh(session);
    Ok(Json(response))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(State(state): State<AppState>) -> Json<serde_json::Value> {
    if let Some(session) = state.sessions.sign_out() {
        if let Err(e) = state.auth.sign_out(&session.access_token).await {
            warn!("Remote sign-out failed for {}: {e}", session.user.id);
        }
    }
    Json(serde_json::json!({ "signedOut": true }))
}

/// GET /api/v1/auth/session
pub async fn handle_get_session(
    State(state): State<AppState>,
) -> Json<Option<SessionResponse>> {
    let session = state
        .sessions
        .current()
        .filter(|s| !s.is_expired(Utc::now()));
    Json(session.as_ref().map(SessionResponse::from))
}
