//! Repository for the `servicenow_instances` table.
//!
//! Every read and write is scoped by `organization_id`, so an instance
//! belonging to another organization behaves exactly like a missing row.
//! Bookkeeping mutators (`touch_last_sync`, `record_connection_test`) take
//! a bare id because callers resolve the instance within tenant scope
//! first.

use ciq_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::instance::{InstanceChanges, NewInstance, ServiceNowInstance};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, name, url, description, auth_type, credentials, status, \
    last_sync_at, last_connection_test_at, connection_status, error_message, \
    organization_id, created_at, updated_at";

/// Provides CRUD operations for ServiceNow instances.
pub struct InstanceRepo;

impl InstanceRepo {
    /// Insert a new instance, returning the created row.
    ///
    /// The row starts with `status = 'active'` (column default).
    pub async fn create(
        pool: &PgPool,
        input: &NewInstance,
    ) -> Result<ServiceNowInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO servicenow_instances
                (name, url, description, auth_type, credentials, organization_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceNowInstance>(&query)
            .bind(&input.name)
            .bind(&input.url)
            .bind(&input.description)
            .bind(&input.auth_type)
            .bind(&input.credentials)
            .bind(input.organization_id)
            .fetch_one(pool)
            .await
    }

    /// Find an instance by ID within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
        organization_id: Uuid,
    ) -> Result<Option<ServiceNowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM servicenow_instances
             WHERE id = $1 AND organization_id = $2"
        );
        sqlx::query_as::<_, ServiceNowInstance>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// List an organization's instances, most recently created first.
    pub async fn list(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<ServiceNowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM servicenow_instances
             WHERE organization_id = $1
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, ServiceNowInstance>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }

    /// Update an instance. Only non-`None` fields in `changes` are applied.
    ///
    /// Returns `None` if the instance does not exist within the
    /// organization.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        organization_id: Uuid,
        changes: &InstanceChanges,
    ) -> Result<Option<ServiceNowInstance>, sqlx::Error> {
        let query = format!(
            "UPDATE servicenow_instances SET
                name = COALESCE($3, name),
                url = COALESCE($4, url),
                description = COALESCE($5, description),
                status = COALESCE($6, status),
                credentials = COALESCE($7, credentials)
             WHERE id = $1 AND organization_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceNowInstance>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(&changes.name)
            .bind(&changes.url)
            .bind(&changes.description)
            .bind(&changes.status)
            .bind(&changes.credentials)
            .fetch_optional(pool)
            .await
    }

    /// Delete an instance. Sync history and dataset rows go with it
    /// (cascade). Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        id: DbId,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM servicenow_instances WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that a sync run started now.
    pub async fn touch_last_sync(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE servicenow_instances SET last_sync_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record the outcome of a connection test.
    ///
    /// Sets `last_connection_test_at` and overwrites `connection_status` /
    /// `error_message` whatever the outcome was.
    pub async fn record_connection_test(
        pool: &PgPool,
        id: DbId,
        connection_status: &str,
        error_message: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE servicenow_instances
             SET last_connection_test_at = NOW(),
                 connection_status = $2,
                 error_message = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(connection_status)
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(())
    }
}
