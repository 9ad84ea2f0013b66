pub mod health;
pub mod instances;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /instances                        list, create
/// /instances/test                   ad-hoc credential test (POST)
/// /instances/{id}                   get, update, delete
/// /instances/{id}/test              connection test (POST)
/// /instances/{id}/sync              run sync (POST)
/// /instances/{id}/sync-history      sync attempts (GET)
/// /instances/{id}/datasets          latest snapshots (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/instances", instances::router())
}
