use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// The signed-in user, inserted by `require_session`.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Uuid);

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(session) = state.sessions.current() else {
        return AppError::Unauthorized.into_response();
    };
    if session.is_expired(Utc::now()) {
        return AppError::Unauthorized.into_response();
    }

    req.extensions_mut().insert(CurrentUser(session.user.id));
    next.run(req).await
}

/// Upload and analysis need a usable AI provider.
pub async fn require_ai_config(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.ai_settings.is_configured() {
        return AppError::AiNotConfigured.into_response();
    }
    next.run(req).await
}
