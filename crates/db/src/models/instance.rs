//! ServiceNow instance entity model and DTOs.

use ciq_core::credentials::{AuthType, CredentialInput};
use ciq_core::status::InstanceStatus;
use ciq_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered ServiceNow deployment, scoped to one organization.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ServiceNowInstance {
    pub id: DbId,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub auth_type: String,
    /// Encrypted credential blob. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub credentials: serde_json::Value,
    pub status: String,
    pub last_sync_at: Option<Timestamp>,
    pub last_connection_test_at: Option<Timestamp>,
    pub connection_status: Option<String>,
    pub error_message: Option<String>,
    pub organization_id: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new instance.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInstance {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub auth_type: AuthType,
    /// Plaintext credential fields; encrypted before they reach the repo.
    #[serde(flatten)]
    pub credentials: CredentialInput,
}

/// DTO for updating an existing instance. All fields are optional; the
/// auth type is fixed at registration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInstance {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub status: Option<InstanceStatus>,
    #[serde(flatten)]
    pub credentials: CredentialInput,
}

/// Insert payload built by the API layer after credential encryption.
#[derive(Debug, Clone)]
pub struct NewInstance {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub auth_type: String,
    pub credentials: serde_json::Value,
    pub organization_id: Uuid,
}

/// Column changes applied by a partial update. `credentials` is the full
/// re-encrypted blob when any credential field was supplied.
#[derive(Debug, Clone, Default)]
pub struct InstanceChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub credentials: Option<serde_json::Value>,
}
