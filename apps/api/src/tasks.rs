//! Background loops: weekly digest, connectivity, auth events.
//! The timers are independent of list mutations; they only share the store lock.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::auth::AuthEvent;
use crate::notifications::sink::dispatch;
use crate::services::session::handle_auth_event;
use crate::state::AppState;

pub fn spawn_all(state: &AppState) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_weekly_digest(
            state.clone(),
            Duration::from_secs(state.config.digest_interval_secs),
        )),
        tokio::spawn(run_connectivity_check(
            state.clone(),
            Duration::from_secs(state.config.connectivity_interval_secs),
        )),
        tokio::spawn(run_auth_listener(state.clone(), state.sessions.subscribe())),
    ]
}

pub async fn run_weekly_digest(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        check_weekly_digest(&state).await;
    }
}

pub async fn check_weekly_digest(state: &AppState) {
    let digest = state.store.write().await.check_weekly_digest(Utc::now());
    if let Some(event) = digest {
        info!("Weekly summary: {}", event.message);
        dispatch(state.sink.clone(), vec![event]);
    }
}

pub async fn run_connectivity_check(state: AppState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        check_connectivity(&state).await;
    }
}

/// Pings the data backend and records the result; logs only transitions.
pub async fn check_connectivity(state: &AppState) -> bool {
    let online = match state.repo.ping().await {
        Ok(()) => true,
        Err(e) => {
            debug!("Connectivity check failed: {e}");
            false
        }
    };

    if state.store.write().await.set_online(online) {
        if online {
            info!("Backend reachable again");
        } else {
            warn!("Backend unreachable; working from local state");
        }
    }
    online
}

/// `events` is subscribed by the caller before the task is spawned.
pub async fn run_auth_listener(state: AppState, mut events: broadcast::Receiver<AuthEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!("Auth event: {:?}", event.kind);
                handle_auth_event(&state, &event).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Auth listener lagged, skipped {skipped} event(s)");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::fixtures::record_at;
    use crate::testing::TestHarness;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_connectivity_transitions() {
        let h = TestHarness::signed_in().await;
        assert!(check_connectivity(&h.state).await);

        h.repo.set_offline(true);
        assert!(!check_connectivity(&h.state).await);
        assert!(!h.state.store.read().await.is_online());

        h.repo.set_offline(false);
        assert!(check_connectivity(&h.state).await);
        assert!(h.state.store.read().await.is_online());
    }

    #[tokio::test]
    async fn test_weekly_digest_emits_once() {
        let h = TestHarness::signed_in().await;
        let mut record = record_at(Uuid::new_v4(), Some(80.0), Utc::now());
        record.user_id = h.user_id;
        h.state
            .store
            .write()
            .await
            .upsert_resume(record, Utc::now());

        check_weekly_digest(&h.state).await;
        check_weekly_digest(&h.state).await;

        let store = h.state.store.read().await;
        let summaries = store
            .feed()
            .items()
            .filter(|e| e.title == crate::notifications::detector::WEEKLY_TITLE)
            .count();
        assert_eq!(summaries, 1);
    }

    #[tokio::test]
    async fn test_auth_listener_reacts_to_sign_in() {
        let h = TestHarness::new();
        h.repo
            .configs
            .lock()
            .unwrap()
            .insert(h.user_id, crate::testing::test_ai_config());
        let listener = tokio::spawn(run_auth_listener(
            h.state.clone(),
            h.state.sessions.subscribe(),
        ));

        h.state.sessions.sign_in(h.auth.session());
        for _ in 0..100 {
            if h.state.ai_settings.is_configured() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(h.state.ai_settings.is_configured());
        listener.abort();
    }
}
