pub mod auth;
pub mod dashboard;
pub mod health;
pub mod middleware;
pub mod notifications;
pub mod resumes;
pub mod settings;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;
use crate::validation::MAX_RESUME_BYTES;

/// Multipart overhead on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let ai_gate = || from_fn_with_state(state.clone(), middleware::require_ai_config);

    // Everything below needs a signed-in session.
    let protected = Router::new()
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).merge(
                post(resumes::handle_upload_resume)
                    .route_layer(ai_gate())
                    .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
            ),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get_resume).delete(resumes::handle_delete_resume),
        )
        .route(
            "/api/v1/resumes/:id/analyze",
            post(resumes::handle_analyze_resume).route_layer(ai_gate()),
        )
        .route(
            "/api/v1/settings/ai",
            get(settings::handle_get_ai_settings).put(settings::handle_put_ai_settings),
        )
        .route("/api/v1/settings/ai/status", get(settings::handle_ai_status))
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        .route(
            "/api/v1/notifications",
            get(notifications::handle_list_notifications)
                .delete(notifications::handle_clear_notifications),
        )
        .route(
            "/api/v1/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/api/v1/notifications/:id/read",
            post(notifications::handle_mark_read),
        )
        .route(
            "/api/v1/notifications/:id",
            delete(notifications::handle_delete_notification),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/oauth/:provider", get(auth::handle_oauth_start))
        .route("/api/v1/auth/callback", get(auth::handle_oauth_callback))
        .route("/api/v1/auth/refresh", post(auth::handle_refresh))
        .route("/api/v1/auth/sign-out", post(auth::handle_sign_out))
        .route("/api/v1/auth/session", get(auth::handle_get_session))
        .merge(protected)
        .with_state(state)
}
