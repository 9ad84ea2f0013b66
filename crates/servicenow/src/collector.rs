//! Dataset collection for instance syncs.
//!
//! [`DatasetCollector`] drives a [`ServiceNowClient`] to gather the three
//! compliance datasets, or reads a local mock payload when mock mode is
//! on. Collection is all-or-nothing: a failure on any one dataset aborts
//! the whole pass, so a sync can never persist a partial snapshot set.

use std::collections::BTreeMap;
use std::path::Path;

use ciq_core::servicenow_config::ServiceNowConfig;
use ciq_core::status::DatasetType;

use crate::client::{ServiceNowClient, ServiceNowError};

/// Records gathered for each dataset type during one collection pass.
pub type DatasetBatches = BTreeMap<DatasetType, Vec<serde_json::Value>>;

/// Errors raised while collecting datasets.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A live fetch failed; propagated unwrapped from the client.
    #[error(transparent)]
    ServiceNow(#[from] ServiceNowError),

    /// The mock payload file exists but could not be read or parsed.
    #[error("Invalid mock payload {path}: {message}")]
    MockPayload { path: String, message: String },
}

/// Gathers the three compliance datasets for one sync pass.
pub struct DatasetCollector<'a> {
    config: &'a ServiceNowConfig,
}

impl<'a> DatasetCollector<'a> {
    pub fn new(config: &'a ServiceNowConfig) -> Self {
        Self { config }
    }

    /// Collect all three datasets.
    ///
    /// Mock mode never touches the client. Live mode fetches each
    /// dataset's table in turn; there is no dataset-level retry and no
    /// fallback to mock.
    pub async fn collect(
        &self,
        client: &mut ServiceNowClient,
    ) -> Result<DatasetBatches, CollectError> {
        if self.config.use_mock {
            return self.load_mock_payload();
        }

        let mut batches = DatasetBatches::new();
        for dataset in DatasetType::ALL {
            let records = self.fetch_dataset(client, dataset).await?;
            batches.insert(dataset, records);
        }
        Ok(batches)
    }

    /// Fetch one dataset from its remote table, capped to the configured
    /// limit even if the remote over-returns.
    async fn fetch_dataset(
        &self,
        client: &mut ServiceNowClient,
        dataset: DatasetType,
    ) -> Result<Vec<serde_json::Value>, ServiceNowError> {
        let limit = self.config.dataset_limit;
        let mut records = client
            .fetch_table(
                self.config.table_for(dataset),
                self.config.fields_for(dataset),
                Some(limit as u32),
                None,
            )
            .await?;
        records.truncate(limit);
        Ok(records)
    }

    /// Read the mock payload file.
    ///
    /// A missing file yields three empty datasets; missing keys default to
    /// empty; each present list is truncated to the dataset limit. A file
    /// that exists but does not parse is an error.
    fn load_mock_payload(&self) -> Result<DatasetBatches, CollectError> {
        let mut batches: DatasetBatches = DatasetType::ALL
            .iter()
            .map(|dataset| (*dataset, Vec::new()))
            .collect();

        let path = Path::new(&self.config.mock_payload_path);
        if !path.exists() {
            return Ok(batches);
        }

        let raw = std::fs::read_to_string(path).map_err(|e| CollectError::MockPayload {
            path: self.config.mock_payload_path.clone(),
            message: e.to_string(),
        })?;
        let payload: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| CollectError::MockPayload {
                path: self.config.mock_payload_path.clone(),
                message: e.to_string(),
            })?;

        for (dataset, records) in batches.iter_mut() {
            if let Some(values) = payload.get(dataset.as_str()).and_then(|v| v.as_array()) {
                *records = values
                    .iter()
                    .take(self.config.dataset_limit)
                    .cloned()
                    .collect();
            }
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::client::ClientAuth;

    fn mock_config(payload_path: &str) -> ServiceNowConfig {
        ServiceNowConfig {
            use_mock: true,
            mock_payload_path: payload_path.to_string(),
            ..ServiceNowConfig::default()
        }
    }

    fn dummy_client(config: &ServiceNowConfig) -> ServiceNowClient {
        ServiceNowClient::new(
            "https://mock.service-now.com",
            ClientAuth::Basic {
                username: "svc".to_string(),
                password: "pw".to_string(),
            },
            config,
        )
        .unwrap()
    }

    fn write_payload(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_missing_mock_file_yields_empty_datasets() {
        let config = mock_config("/nonexistent/mock_payload.json");
        let mut client = dummy_client(&config);

        let batches = DatasetCollector::new(&config)
            .collect(&mut client)
            .await
            .unwrap();

        assert_eq!(batches.len(), 3);
        for dataset in DatasetType::ALL {
            assert!(batches[&dataset].is_empty());
        }
    }

    #[tokio::test]
    async fn test_mock_payload_counts() {
        let file = write_payload(
            r#"{
                "controls": [{"sys_id": "c1"}, {"sys_id": "c2"}, {"sys_id": "c3"},
                             {"sys_id": "c4"}, {"sys_id": "c5"}],
                "risks": [{"sys_id": "r1"}, {"sys_id": "r2"}, {"sys_id": "r3"}],
                "compliance": []
            }"#,
        );
        let config = mock_config(file.path().to_str().unwrap());
        let mut client = dummy_client(&config);

        let batches = DatasetCollector::new(&config)
            .collect(&mut client)
            .await
            .unwrap();

        assert_eq!(batches[&DatasetType::Controls].len(), 5);
        assert_eq!(batches[&DatasetType::Risks].len(), 3);
        assert_eq!(batches[&DatasetType::Compliance].len(), 0);
    }

    #[tokio::test]
    async fn test_missing_keys_default_to_empty() {
        let file = write_payload(r#"{"controls": [{"sys_id": "c1"}]}"#);
        let config = mock_config(file.path().to_str().unwrap());
        let mut client = dummy_client(&config);

        let batches = DatasetCollector::new(&config)
            .collect(&mut client)
            .await
            .unwrap();

        assert_eq!(batches[&DatasetType::Controls].len(), 1);
        assert!(batches[&DatasetType::Risks].is_empty());
        assert!(batches[&DatasetType::Compliance].is_empty());
    }

    #[tokio::test]
    async fn test_mock_payload_truncated_to_limit() {
        let records: Vec<String> = (0..10).map(|i| format!(r#"{{"sys_id": "c{i}"}}"#)).collect();
        let file = write_payload(&format!(r#"{{"controls": [{}]}}"#, records.join(",")));

        let mut config = mock_config(file.path().to_str().unwrap());
        config.dataset_limit = 4;
        let mut client = dummy_client(&config);

        let batches = DatasetCollector::new(&config)
            .collect(&mut client)
            .await
            .unwrap();

        assert_eq!(batches[&DatasetType::Controls].len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_mock_payload_is_an_error() {
        let file = write_payload("{not json");
        let config = mock_config(file.path().to_str().unwrap());
        let mut client = dummy_client(&config);

        let result = DatasetCollector::new(&config).collect(&mut client).await;
        assert!(matches!(result, Err(CollectError::MockPayload { .. })));
    }
}
