//! Sync history entity model.

use ciq_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One sync attempt for an instance.
///
/// Created in the `running` state and transitioned exactly once to
/// `completed` or `failed`; terminal rows are never mutated again.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstanceSyncHistory {
    pub id: DbId,
    pub instance_id: DbId,
    pub sync_type: String,
    pub status: String,
    /// Per-dataset record counts, set on completion.
    pub records_synced: Option<serde_json::Value>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
