use axum::{extract::State, Json};

use crate::dashboard::{compute, DashboardMetrics};
use crate::state::AppState;

/// GET /api/v1/dashboard
pub async fn handle_dashboard(State(state): State<AppState>) -> Json<DashboardMetrics> {
    let store = state.store.read().await;
    Json(compute(&store))
}
