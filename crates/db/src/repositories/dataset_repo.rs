//! Repository for the `instance_datasets` table.

use ciq_core::types::DbId;
use sqlx::PgPool;

use crate::models::dataset::InstanceDataset;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, instance_id, dataset_type, record_count, payload, \
    last_synced_at, created_at, updated_at";

/// Provides snapshot operations for instance datasets.
pub struct DatasetRepo;

impl DatasetRepo {
    /// Replace the stored snapshot for `(instance_id, dataset_type)`.
    ///
    /// Full replace-on-conflict: the previous payload is discarded, never
    /// merged. Repeating the same upsert yields the same stored state
    /// (modulo `last_synced_at`).
    pub async fn upsert(
        pool: &PgPool,
        instance_id: DbId,
        dataset_type: &str,
        payload: &serde_json::Value,
        record_count: i32,
    ) -> Result<InstanceDataset, sqlx::Error> {
        let query = format!(
            "INSERT INTO instance_datasets
                (instance_id, dataset_type, record_count, payload, last_synced_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (instance_id, dataset_type) DO UPDATE SET
                record_count = EXCLUDED.record_count,
                payload = EXCLUDED.payload,
                last_synced_at = EXCLUDED.last_synced_at
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InstanceDataset>(&query)
            .bind(instance_id)
            .bind(dataset_type)
            .bind(record_count)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Find the snapshot for one `(instance_id, dataset_type)` pair.
    pub async fn find(
        pool: &PgPool,
        instance_id: DbId,
        dataset_type: &str,
    ) -> Result<Option<InstanceDataset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM instance_datasets
             WHERE instance_id = $1 AND dataset_type = $2"
        );
        sqlx::query_as::<_, InstanceDataset>(&query)
            .bind(instance_id)
            .bind(dataset_type)
            .fetch_optional(pool)
            .await
    }

    /// List an instance's snapshots ordered by dataset type.
    pub async fn list_for_instance(
        pool: &PgPool,
        instance_id: DbId,
    ) -> Result<Vec<InstanceDataset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM instance_datasets
             WHERE instance_id = $1
             ORDER BY dataset_type ASC"
        );
        sqlx::query_as::<_, InstanceDataset>(&query)
            .bind(instance_id)
            .fetch_all(pool)
            .await
    }
}
