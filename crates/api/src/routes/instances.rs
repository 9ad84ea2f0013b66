//! Route definitions for the `/instances` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::instances;
use crate::state::AppState;

/// Routes mounted at `/instances`.
///
/// ```text
/// GET    /                    -> list
/// POST   /                    -> create
/// POST   /test                -> test_credentials
/// GET    /{id}                -> get_by_id
/// PUT    /{id}                -> update
/// DELETE /{id}                -> delete
/// POST   /{id}/test           -> test_connection
/// POST   /{id}/sync           -> sync
/// GET    /{id}/sync-history   -> list_sync_history
/// GET    /{id}/datasets       -> list_datasets
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(instances::list).post(instances::create))
        .route("/test", post(instances::test_credentials))
        .route(
            "/{id}",
            get(instances::get_by_id)
                .put(instances::update)
                .delete(instances::delete),
        )
        .route("/{id}/test", post(instances::test_connection))
        .route("/{id}/sync", post(instances::sync))
        .route("/{id}/sync-history", get(instances::list_sync_history))
        .route("/{id}/datasets", get(instances::list_datasets))
}
