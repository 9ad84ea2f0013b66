//! Instance synchronization and connection testing.
//!
//! [`SyncManager`] owns every write to sync history and dataset snapshots.
//! It decrypts stored credentials, builds a short-lived client per
//! operation, delegates collection to [`DatasetCollector`], and records
//! the outcome. Once a sync has a history row, that row always reaches a
//! terminal state, whatever goes wrong in between.

use ciq_core::credentials::Credentials;
use ciq_core::error::CoreError;
use ciq_core::servicenow_config::ServiceNowConfig;
use ciq_core::status::{ConnectionStatus, SyncTrigger};
use ciq_core::types::DbId;
use ciq_core::vault::CredentialVault;
use sqlx::PgPool;
use uuid::Uuid;

use ciq_db::models::instance::ServiceNowInstance;
use ciq_db::models::sync_history::InstanceSyncHistory;
use ciq_db::repositories::{DatasetRepo, InstanceRepo, SyncHistoryRepo};

use crate::client::{ClientAuth, PingResult, ServiceNowClient, ServiceNowError};
use crate::collector::{CollectError, DatasetCollector};

/// Errors from [`SyncManager`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Instance unresolvable within the caller's organization.
    #[error("Entity not found: ServiceNowInstance with id {0}")]
    InstanceNotFound(DbId),

    /// Stored credentials could not be decrypted, or supplied credentials
    /// are incomplete.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The remote API call failed (non-2xx, network, timeout).
    #[error("ServiceNow API error: {0}")]
    Remote(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a connection test. Remote failures are reported here, not
/// raised as errors.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionTestOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PingResult>,
}

/// Runs syncs and connection tests against registered instances.
pub struct SyncManager<'a> {
    pool: &'a PgPool,
    config: &'a ServiceNowConfig,
    vault: &'a CredentialVault,
}

impl<'a> SyncManager<'a> {
    pub fn new(pool: &'a PgPool, config: &'a ServiceNowConfig, vault: &'a CredentialVault) -> Self {
        Self {
            pool,
            config,
            vault,
        }
    }

    /// Run one synchronous sync for an instance.
    ///
    /// Fails fast with [`SyncError::InstanceNotFound`] before any history
    /// row is created. After the `running` row exists, every failure path
    /// marks it `failed` with the error text before propagating. Dataset
    /// rows are written only after the whole collection succeeded, so a
    /// failed sync leaves them untouched. The instance's own `status`
    /// column is never modified here.
    ///
    /// Concurrent syncs of the same instance are not serialized; the last
    /// run to finish wins the stored dataset state.
    pub async fn sync_instance(
        &self,
        instance_id: DbId,
        organization_id: Uuid,
        sync_type: SyncTrigger,
    ) -> Result<InstanceSyncHistory, SyncError> {
        let instance = InstanceRepo::find_by_id(self.pool, instance_id, organization_id)
            .await?
            .ok_or(SyncError::InstanceNotFound(instance_id))?;

        let history = SyncHistoryRepo::create(self.pool, instance.id, sync_type.as_str()).await?;

        match self.execute_sync(&instance).await {
            Ok(counts) => {
                let completed = SyncHistoryRepo::mark_completed(self.pool, history.id, &counts)
                    .await?
                    .ok_or(SyncError::Database(sqlx::Error::RowNotFound))?;
                tracing::info!(
                    instance_id = instance.id,
                    history_id = completed.id,
                    records = %counts,
                    "Instance sync completed",
                );
                Ok(completed)
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(mark_err) =
                    SyncHistoryRepo::mark_failed(self.pool, history.id, &message).await
                {
                    tracing::error!(
                        history_id = history.id,
                        error = %mark_err,
                        "Failed to record sync failure",
                    );
                }
                tracing::warn!(
                    instance_id = instance.id,
                    history_id = history.id,
                    error = %message,
                    "Instance sync failed",
                );
                Err(err)
            }
        }
    }

    /// Test connectivity for a stored instance.
    ///
    /// Always records the outcome (`connection_status`, `error_message`,
    /// `last_connection_test_at`) on the instance row. Remote and
    /// credential failures come back as `success: false`; only an
    /// instance missing from the caller's organization is an error.
    pub async fn test_connection(
        &self,
        instance_id: DbId,
        organization_id: Uuid,
    ) -> Result<ConnectionTestOutcome, SyncError> {
        let instance = InstanceRepo::find_by_id(self.pool, instance_id, organization_id)
            .await?
            .ok_or(SyncError::InstanceNotFound(instance_id))?;

        let attempt = match self.decrypt_auth(&instance) {
            Ok(auth) => self
                .run_ping(&instance.url, auth)
                .await
                .map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        match attempt {
            Ok(details) => {
                InstanceRepo::record_connection_test(
                    self.pool,
                    instance.id,
                    ConnectionStatus::Success.as_str(),
                    None,
                )
                .await?;
                Ok(ConnectionTestOutcome {
                    success: true,
                    message: "Connection test successful".to_string(),
                    details: Some(details),
                })
            }
            Err(cause) => {
                let message = format!("Connection test failed: {cause}");
                InstanceRepo::record_connection_test(
                    self.pool,
                    instance.id,
                    ConnectionStatus::Failed.as_str(),
                    Some(&message),
                )
                .await?;
                tracing::warn!(
                    instance_id = instance.id,
                    error = %cause,
                    "ServiceNow connection test failed",
                );
                Ok(ConnectionTestOutcome {
                    success: false,
                    message,
                    details: None,
                })
            }
        }
    }

    /// Test supplied plaintext credentials against a URL without touching
    /// any stored instance.
    pub async fn test_credentials(
        &self,
        url: &str,
        auth: ClientAuth,
    ) -> Result<ConnectionTestOutcome, SyncError> {
        let details = self.run_ping(url, auth).await.map_err(|err| match err {
            ServiceNowError::Credential(message) => SyncError::Credential(message),
            other => SyncError::Remote(format!("ServiceNow connection failed: {other}")),
        })?;
        Ok(ConnectionTestOutcome {
            success: true,
            message: "Connection verified".to_string(),
            details: Some(details),
        })
    }

    // ---- private helpers ----

    /// Decrypt -> fetch -> upsert. Returns the per-dataset counts object
    /// recorded on the completed history row.
    async fn execute_sync(
        &self,
        instance: &ServiceNowInstance,
    ) -> Result<serde_json::Value, SyncError> {
        InstanceRepo::touch_last_sync(self.pool, instance.id).await?;

        let auth = self.decrypt_auth(instance)?;
        let mut client = ServiceNowClient::new(&instance.url, auth, self.config)
            .map_err(|e| SyncError::Remote(e.to_string()))?;

        let batches = DatasetCollector::new(self.config)
            .collect(&mut client)
            .await
            .map_err(map_collect_error)?;

        let mut counts = serde_json::Map::new();
        for (dataset, records) in batches {
            let record_count = records.len();
            DatasetRepo::upsert(
                self.pool,
                instance.id,
                dataset.as_str(),
                &serde_json::Value::Array(records),
                record_count as i32,
            )
            .await?;
            counts.insert(
                dataset.as_str().to_string(),
                serde_json::Value::from(record_count),
            );
        }
        Ok(serde_json::Value::Object(counts))
    }

    /// Decrypt the stored credential blob into client auth material.
    fn decrypt_auth(&self, instance: &ServiceNowInstance) -> Result<ClientAuth, SyncError> {
        let credentials: Credentials = serde_json::from_value(instance.credentials.clone())
            .map_err(|e| SyncError::Credential(format!("Stored credentials are malformed: {e}")))?;

        match credentials {
            Credentials::Basic {
                username,
                encrypted_password,
            } => Ok(ClientAuth::Basic {
                username,
                password: self.decrypt_secret(&encrypted_password)?,
            }),
            Credentials::Oauth {
                client_id,
                encrypted_client_secret,
            } => Ok(ClientAuth::OAuth {
                client_id,
                client_secret: self.decrypt_secret(&encrypted_client_secret)?,
            }),
        }
    }

    fn decrypt_secret(&self, ciphertext: &str) -> Result<String, SyncError> {
        self.vault.decrypt(ciphertext).map_err(|err| match err {
            CoreError::Credential(message) => SyncError::Credential(message),
            other => SyncError::Credential(other.to_string()),
        })
    }

    async fn run_ping(&self, url: &str, auth: ClientAuth) -> Result<PingResult, ServiceNowError> {
        let mut client = ServiceNowClient::new(url, auth, self.config)?;
        client.ping(&self.config.ping_table).await
    }
}

/// Collapse collector errors into the sync taxonomy: incomplete
/// credentials stay distinguishable from remote failures.
fn map_collect_error(err: CollectError) -> SyncError {
    match err {
        CollectError::ServiceNow(ServiceNowError::Credential(message)) => {
            SyncError::Credential(message)
        }
        other => SyncError::Remote(other.to_string()),
    }
}
