use std::sync::Arc;

use ciq_core::vault::CredentialVault;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: ciq_db::DbPool,
    /// Server configuration (JWT, CORS, ServiceNow settings).
    pub config: Arc<ServerConfig>,
    /// Credential vault keyed from the configured encryption secret.
    pub vault: Arc<CredentialVault>,
}
