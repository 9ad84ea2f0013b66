//! Health check route.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

/// Routes mounted at the root (outside `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Report service and database health.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database_ok = ciq_db::health_check(&state.pool).await.is_ok();

    Json(serde_json::json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "service": "ciq-api",
        "database": if database_ok { "ok" } else { "unavailable" },
    }))
}
