//! Handlers for ServiceNow instance management.
//!
//! CRUD plus connection tests, sync runs, sync history, and dataset
//! snapshots. Every operation is scoped to the organization carried by
//! the caller's token; an instance outside that organization is
//! indistinguishable from a missing one.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ciq_core::credentials::{self, AuthType, CredentialInput, Credentials};
use ciq_core::error::CoreError;
use ciq_core::instance::{normalize_instance_url, validate_instance_name};
use ciq_core::status::SyncTrigger;
use ciq_core::types::{DbId, Timestamp};
use ciq_db::models::instance::{
    CreateInstance, InstanceChanges, NewInstance, ServiceNowInstance, UpdateInstance,
};
use ciq_db::repositories::{DatasetRepo, InstanceRepo, SyncHistoryRepo};
use ciq_servicenow::client::ClientAuth;
use ciq_servicenow::sync::SyncManager;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Verify that an instance exists within the caller's organization,
/// returning the full row.
async fn ensure_instance_exists(
    pool: &sqlx::PgPool,
    id: DbId,
    org_id: Uuid,
) -> AppResult<ServiceNowInstance> {
    InstanceRepo::find_by_id(pool, id, org_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ServiceNowInstance",
                id,
            })
        })
}

/// Build client auth material from plaintext request fields.
fn client_auth_from_input(auth_type: AuthType, input: &CredentialInput) -> ClientAuth {
    match auth_type {
        AuthType::Basic => ClientAuth::Basic {
            username: input.username.clone().unwrap_or_default(),
            password: input.password.clone().unwrap_or_default(),
        },
        AuthType::Oauth => ClientAuth::OAuth {
            client_id: input.client_id.clone().unwrap_or_default(),
            client_secret: input.client_secret.clone().unwrap_or_default(),
        },
    }
}

fn sync_manager(state: &AppState) -> SyncManager<'_> {
    SyncManager::new(&state.pool, &state.config.servicenow, &state.vault)
}

// ---------------------------------------------------------------------------
// POST /instances
// ---------------------------------------------------------------------------

/// Register a new ServiceNow instance for the caller's organization.
///
/// Credentials are validated per auth type before anything is persisted,
/// then encrypted into the stored blob.
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateInstance>,
) -> AppResult<impl IntoResponse> {
    validate_instance_name(&input.name)?;
    let url = normalize_instance_url(&input.url)?;
    credentials::validate_for_create(input.auth_type, &input.credentials)?;

    let blob = credentials::encrypt_credentials(&state.vault, input.auth_type, &input.credentials)?;
    let new_instance = NewInstance {
        name: input.name,
        url,
        description: input.description,
        auth_type: input.auth_type.as_str().to_string(),
        credentials: serde_json::to_value(&blob)
            .map_err(|e| AppError::InternalError(e.to_string()))?,
        organization_id: user.org_id,
    };

    let instance = InstanceRepo::create(&state.pool, &new_instance).await?;

    tracing::info!(
        instance_id = instance.id,
        organization_id = %user.org_id,
        auth_type = %instance.auth_type,
        "ServiceNow instance registered",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: instance })))
}

// ---------------------------------------------------------------------------
// GET /instances
// ---------------------------------------------------------------------------

/// List the organization's instances, most recently created first.
pub async fn list(user: AuthUser, State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let instances = InstanceRepo::list(&state.pool, user.org_id).await?;
    Ok(Json(DataResponse { data: instances }))
}

// ---------------------------------------------------------------------------
// GET /instances/{id}
// ---------------------------------------------------------------------------

/// Get one instance.
pub async fn get_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = ensure_instance_exists(&state.pool, id, user.org_id).await?;
    Ok(Json(DataResponse { data: instance }))
}

// ---------------------------------------------------------------------------
// PUT /instances/{id}
// ---------------------------------------------------------------------------

/// Partially update an instance.
///
/// Only supplied fields change. Credentials are re-encrypted only when a
/// credential field is present, preserving unsupplied sub-fields from the
/// existing blob; the auth type is fixed at registration.
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateInstance>,
) -> AppResult<impl IntoResponse> {
    let existing = ensure_instance_exists(&state.pool, id, user.org_id).await?;

    if let Some(name) = &input.name {
        validate_instance_name(name)?;
    }
    let url = match &input.url {
        Some(url) => Some(normalize_instance_url(url)?),
        None => None,
    };

    let credentials_blob = if input.credentials.is_empty() {
        None
    } else {
        let stored: Credentials = serde_json::from_value(existing.credentials.clone())
            .map_err(|e| AppError::InternalError(format!("Stored credentials are malformed: {e}")))?;
        let merged = credentials::merge_credentials(&state.vault, &stored, &input.credentials)?;
        Some(
            serde_json::to_value(&merged)
                .map_err(|e| AppError::InternalError(e.to_string()))?,
        )
    };

    let changes = InstanceChanges {
        name: input.name,
        url,
        description: input.description,
        status: input.status.map(|s| s.as_str().to_string()),
        credentials: credentials_blob,
    };

    let instance = InstanceRepo::update(&state.pool, id, user.org_id, &changes)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "ServiceNowInstance",
                id,
            })
        })?;

    tracing::info!(instance_id = instance.id, "ServiceNow instance updated");
    Ok(Json(DataResponse { data: instance }))
}

// ---------------------------------------------------------------------------
// DELETE /instances/{id}
// ---------------------------------------------------------------------------

/// Delete an instance. Sync history and dataset snapshots cascade.
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = InstanceRepo::delete(&state.pool, id, user.org_id).await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ServiceNowInstance",
            id,
        }));
    }

    tracing::info!(instance_id = id, organization_id = %user.org_id, "ServiceNow instance deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /instances/test  (ad-hoc credential check, nothing stored)
// ---------------------------------------------------------------------------

/// Request body for an ad-hoc credential test.
#[derive(Debug, Deserialize)]
pub struct ConnectionTestRequest {
    pub url: String,
    pub auth_type: AuthType,
    #[serde(flatten)]
    pub credentials: CredentialInput,
}

/// Test supplied credentials against a URL without registering anything.
pub async fn test_credentials(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ConnectionTestRequest>,
) -> AppResult<impl IntoResponse> {
    let url = normalize_instance_url(&input.url)?;
    let auth = client_auth_from_input(input.auth_type, &input.credentials);

    let outcome = sync_manager(&state).test_credentials(&url, auth).await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// POST /instances/{id}/test
// ---------------------------------------------------------------------------

/// Run a connection test against a stored instance.
///
/// Always returns 200 with `{success, message, details?}` -- remote
/// failures are a test result, not an error. The outcome is recorded on
/// the instance row either way.
pub async fn test_connection(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let outcome = sync_manager(&state).test_connection(id, user.org_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// POST /instances/{id}/sync
// ---------------------------------------------------------------------------

/// Request body for a sync run. The trigger defaults to `manual`.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub sync_type: SyncTrigger,
}

/// Response for a successful sync run.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub sync_id: DbId,
    pub status: String,
    pub message: String,
    pub started_at: Timestamp,
}

/// Run a synchronous dataset sync for an instance.
///
/// The call blocks until the sync reaches a terminal state. Failures
/// surface as errors after the history row has been marked `failed`.
pub async fn sync(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<SyncRequest>,
) -> AppResult<impl IntoResponse> {
    let history = sync_manager(&state)
        .sync_instance(id, user.org_id, request.sync_type)
        .await?;

    Ok(Json(DataResponse {
        data: SyncResponse {
            sync_id: history.id,
            status: history.status.clone(),
            message: "Sync completed successfully".to_string(),
            started_at: history.started_at,
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /instances/{id}/sync-history
// ---------------------------------------------------------------------------

/// List sync attempts for an instance, most recent first.
pub async fn list_sync_history(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = ensure_instance_exists(&state.pool, id, user.org_id).await?;
    let history = SyncHistoryRepo::list_for_instance(&state.pool, instance.id).await?;
    Ok(Json(DataResponse { data: history }))
}

// ---------------------------------------------------------------------------
// GET /instances/{id}/datasets
// ---------------------------------------------------------------------------

/// List the latest dataset snapshots for an instance.
pub async fn list_datasets(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let instance = ensure_instance_exists(&state.pool, id, user.org_id).await?;
    let datasets = DatasetRepo::list_for_instance(&state.pool, instance.id).await?;
    Ok(Json(DataResponse { data: datasets }))
}
