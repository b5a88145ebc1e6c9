use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::auth::{AuthEvent, AuthEventKind, AuthSession};
use crate::errors::AppError;
use crate::services::resumes::load_resumes;
use crate::state::AppState;

/// Reacts to one auth state change.
pub async fn handle_auth_event(state: &AppState, event: &AuthEvent) {
    let result = match (event.kind, &event.session) {
        (AuthEventKind::SignedIn, Some(session)) => on_signed_in(state, session).await,
        (AuthEventKind::TokenRefreshed, Some(session)) => {
            ensure_ai_config(state, session.user.id).await
        }
        (AuthEventKind::SignedOut, _) => {
            on_signed_out(state).await;
            Ok(())
        }
        (kind, None) => {
            warn!("Ignoring {kind:?} event without a session");
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(
            "Handling {:?} failed [{}] {}: {e}",
            event.kind,
            e.category().as_str(),
            e.code()
        );
    }
}

/// Loads the AI configuration (once per session) and the résumé list.
/// State left by a different user is dropped first.
pub async fn on_signed_in(state: &AppState, session: &AuthSession) -> Result<(), AppError> {
    let user_id = session.user.id;
    {
        let mut store = state.store.write().await;
        let stale = match store.session_user() {
            Some(owner) => owner != user_id,
            None => store.is_primed(),
        };
        if stale {
            info!("Switching session to user {user_id}");
            store.clear();
            state.ai_settings.clear();
        }
        store.set_session_user(Some(user_id));
    }

    if let Err(e) = ensure_ai_config(state, user_id).await {
        warn!("AI configuration not loaded for {user_id}: {e}");
    }
    load_resumes(state, user_id).await?;
    Ok(())
}

/// Fetches the persisted AI configuration unless this session already has it.
pub async fn ensure_ai_config(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    if state.store.read().await.ai_config_loaded_for() == Some(user_id) {
        return Ok(());
    }

    match state.repo.get_ai_config(user_id).await? {
        Some(config) => {
            info!(
                "Loaded AI configuration for {user_id} (provider: {})",
                config.provider.map(|p| p.as_str()).unwrap_or("none")
            );
            state.ai_settings.set_config(config);
        }
        None => state.ai_settings.clear(),
    }
    state
        .store
        .write()
        .await
        .set_ai_config_loaded_for(Some(user_id));
    Ok(())
}

pub async fn on_signed_out(state: &AppState) {
    state.ai_settings.clear();
    state.store.write().await.clear();
    info!("Signed out; session state cleared");
}
