use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::notification::NotificationEvent;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationEvent>,
    pub unread_count: usize,
}

/// GET /api/v1/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
) -> Json<NotificationListResponse> {
    let store = state.store.read().await;
    Json(NotificationListResponse {
        notifications: store.feed().to_vec(),
        unread_count: store.feed().unread_count(),
    })
}

/// POST /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.write().await.feed_mut().mark_read(&id) {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn handle_mark_all_read(State(state): State<AppState>) -> StatusCode {
    state.store.write().await.feed_mut().mark_all_read();
    StatusCode::NO_CONTENT
}

/// DELETE /api/v1/notifications/:id
pub async fn handle_delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.write().await.feed_mut().remove(&id) {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/notifications
pub async fn handle_clear_notifications(State(state): State<AppState>) -> StatusCode {
    state.store.write().await.feed_mut().clear();
    StatusCode::NO_CONTENT
}
