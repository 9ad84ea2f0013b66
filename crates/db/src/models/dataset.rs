//! Dataset snapshot entity model.

use ciq_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Latest snapshot for one `(instance, dataset_type)` pair.
///
/// Each sync fully replaces the payload; there is never more than one row
/// per pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstanceDataset {
    pub id: DbId,
    pub instance_id: DbId,
    pub dataset_type: String,
    pub record_count: i32,
    /// Raw record array as returned by the collector.
    pub payload: serde_json::Value,
    pub last_synced_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
