//! ServiceNow connectivity configuration.
//!
//! Constructed once at startup (see the API crate's `ServerConfig`) and
//! passed explicitly to the client, collector, and sync manager -- no
//! component reads ambient global state.

use crate::status::DatasetType;

/// Settings for talking to a ServiceNow instance and collecting datasets.
#[derive(Debug, Clone)]
pub struct ServiceNowConfig {
    /// Remote request timeout in seconds (token, ping, and table fetches).
    pub timeout_secs: u64,
    /// Default `sysparm_limit` when a fetch passes no explicit limit.
    pub page_size: u32,
    /// Hard cap applied to every dataset, in both live and mock mode.
    pub dataset_limit: usize,
    /// Table used by connection-test pings.
    pub ping_table: String,
    pub control_table: String,
    pub risk_table: String,
    pub compliance_table: String,
    pub control_fields: Vec<String>,
    pub risk_fields: Vec<String>,
    pub compliance_fields: Vec<String>,
    /// When set, syncs read the mock payload file instead of the remote API.
    pub use_mock: bool,
    pub mock_payload_path: String,
}

impl Default for ServiceNowConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            page_size: 200,
            dataset_limit: 200,
            ping_table: "sys_user".to_string(),
            control_table: "sn_compliance_control".to_string(),
            risk_table: "sn_risk_risk".to_string(),
            compliance_table: "sn_compliance_policy".to_string(),
            control_fields: split_fields("sys_id,name,number,state"),
            risk_fields: split_fields("sys_id,name,number,state,impact"),
            compliance_fields: split_fields("sys_id,name,number,state,type"),
            use_mock: true,
            mock_payload_path: "data/mock_servicenow_payload.json".to_string(),
        }
    }
}

impl ServiceNowConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                              |
    /// |--------------------------------|--------------------------------------|
    /// | `SERVICENOW_TIMEOUT_SECS`      | `30`                                 |
    /// | `SERVICENOW_PAGE_SIZE`         | `200`                                |
    /// | `SERVICENOW_DATASET_LIMIT`     | `200`                                |
    /// | `SERVICENOW_PING_TABLE`        | `sys_user`                           |
    /// | `SERVICENOW_CONTROL_TABLE`     | `sn_compliance_control`              |
    /// | `SERVICENOW_RISK_TABLE`        | `sn_risk_risk`                       |
    /// | `SERVICENOW_COMPLIANCE_TABLE`  | `sn_compliance_policy`               |
    /// | `SERVICENOW_CONTROL_FIELDS`    | `sys_id,name,number,state`           |
    /// | `SERVICENOW_RISK_FIELDS`       | `sys_id,name,number,state,impact`    |
    /// | `SERVICENOW_COMPLIANCE_FIELDS` | `sys_id,name,number,state,type`      |
    /// | `SERVICENOW_USE_MOCK`          | `true`                               |
    /// | `SERVICENOW_MOCK_PAYLOAD`      | `data/mock_servicenow_payload.json`  |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout_secs: u64 = env_or("SERVICENOW_TIMEOUT_SECS", defaults.timeout_secs);
        let page_size: u32 = env_or("SERVICENOW_PAGE_SIZE", defaults.page_size);
        let dataset_limit: usize = env_or("SERVICENOW_DATASET_LIMIT", defaults.dataset_limit);

        let use_mock: bool = env_or("SERVICENOW_USE_MOCK", defaults.use_mock);

        Self {
            timeout_secs,
            page_size,
            dataset_limit,
            ping_table: env_string("SERVICENOW_PING_TABLE", &defaults.ping_table),
            control_table: env_string("SERVICENOW_CONTROL_TABLE", &defaults.control_table),
            risk_table: env_string("SERVICENOW_RISK_TABLE", &defaults.risk_table),
            compliance_table: env_string("SERVICENOW_COMPLIANCE_TABLE", &defaults.compliance_table),
            control_fields: split_fields(&env_string(
                "SERVICENOW_CONTROL_FIELDS",
                "sys_id,name,number,state",
            )),
            risk_fields: split_fields(&env_string(
                "SERVICENOW_RISK_FIELDS",
                "sys_id,name,number,state,impact",
            )),
            compliance_fields: split_fields(&env_string(
                "SERVICENOW_COMPLIANCE_FIELDS",
                "sys_id,name,number,state,type",
            )),
            use_mock,
            mock_payload_path: env_string("SERVICENOW_MOCK_PAYLOAD", &defaults.mock_payload_path),
        }
    }

    /// The remote table backing a dataset type.
    pub fn table_for(&self, dataset: DatasetType) -> &str {
        match dataset {
            DatasetType::Controls => &self.control_table,
            DatasetType::Risks => &self.risk_table,
            DatasetType::Compliance => &self.compliance_table,
        }
    }

    /// The field list requested for a dataset type.
    pub fn fields_for(&self, dataset: DatasetType) -> &[String] {
        match dataset {
            DatasetType::Controls => &self.control_fields,
            DatasetType::Risks => &self.risk_fields,
            DatasetType::Compliance => &self.compliance_fields,
        }
    }
}

/// Read an env var and parse it, falling back to `default` when unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse -- misconfiguration
/// should fail fast at startup.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid value, got '{value}'")),
        Err(_) => default,
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Split a comma-separated field list, dropping empty entries.
fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
