//! Repository for the `instance_sync_history` table.
//!
//! History rows follow a strict lifecycle: inserted as `running`, then
//! transitioned exactly once to `completed` or `failed`. The terminal
//! transitions guard on `status = 'running'`, so a finished row can never
//! be rewritten.

use ciq_core::types::DbId;
use sqlx::PgPool;

use crate::models::sync_history::InstanceSyncHistory;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, instance_id, sync_type, status, records_synced, \
    started_at, completed_at, error_message, created_at, updated_at";

/// Provides lifecycle operations for sync history rows.
pub struct SyncHistoryRepo;

impl SyncHistoryRepo {
    /// Insert a new history row in the `running` state, started now.
    pub async fn create(
        pool: &PgPool,
        instance_id: DbId,
        sync_type: &str,
    ) -> Result<InstanceSyncHistory, sqlx::Error> {
        let query = format!(
            "INSERT INTO instance_sync_history (instance_id, sync_type, status, started_at)
             VALUES ($1, $2, 'running', NOW())
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InstanceSyncHistory>(&query)
            .bind(instance_id)
            .bind(sync_type)
            .fetch_one(pool)
            .await
    }

    /// Transition a running sync to `completed`, recording per-dataset
    /// counts. Returns `None` if the row is missing or already terminal.
    pub async fn mark_completed(
        pool: &PgPool,
        id: DbId,
        records_synced: &serde_json::Value,
    ) -> Result<Option<InstanceSyncHistory>, sqlx::Error> {
        let query = format!(
            "UPDATE instance_sync_history
             SET status = 'completed', completed_at = NOW(), records_synced = $2
             WHERE id = $1 AND status = 'running'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InstanceSyncHistory>(&query)
            .bind(id)
            .bind(records_synced)
            .fetch_optional(pool)
            .await
    }

    /// Transition a running sync to `failed`, recording the error text.
    /// Returns `None` if the row is missing or already terminal.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        error_message: &str,
    ) -> Result<Option<InstanceSyncHistory>, sqlx::Error> {
        let query = format!(
            "UPDATE instance_sync_history
             SET status = 'failed', completed_at = NOW(), error_message = $2
             WHERE id = $1 AND status = 'running'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InstanceSyncHistory>(&query)
            .bind(id)
            .bind(error_message)
            .fetch_optional(pool)
            .await
    }

    /// Find a history row by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<InstanceSyncHistory>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM instance_sync_history WHERE id = $1");
        sqlx::query_as::<_, InstanceSyncHistory>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List sync attempts for an instance, most recent first.
    pub async fn list_for_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<InstanceSyncHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM instance_sync_history
             WHERE instance_id = $1
             ORDER BY started_at DESC, id DESC"
        );
        sqlx::query_as::<_, InstanceSyncHistory>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }
}
