//! Closed string vocabularies for instances, sync runs, and datasets.
//!
//! These are persisted as plain strings (with matching CHECK constraints)
//! and parsed back at the boundaries that care.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Dataset categories synchronized per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Controls,
    Risks,
    Compliance,
}

impl DatasetType {
    /// All dataset types, in the order they are collected.
    pub const ALL: [DatasetType; 3] = [
        DatasetType::Controls,
        DatasetType::Risks,
        DatasetType::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetType::Controls => "controls",
            DatasetType::Risks => "risks",
            DatasetType::Compliance => "compliance",
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DatasetType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "controls" => Ok(DatasetType::Controls),
            "risks" => Ok(DatasetType::Risks),
            "compliance" => Ok(DatasetType::Compliance),
            other => Err(CoreError::Validation(format!(
                "Unknown dataset type: {other}"
            ))),
        }
    }
}

/// How a sync run was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    #[default]
    Manual,
    Scheduled,
    Automatic,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::Scheduled => "scheduled",
            SyncTrigger::Automatic => "automatic",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync attempt lifecycle: `running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrative state of a registered instance.
///
/// Sync failures never touch this; connectivity problems are tracked via
/// [`ConnectionStatus`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Active,
    Inactive,
    Error,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Active => "active",
            InstanceStatus::Inactive => "inactive",
            InstanceStatus::Error => "error",
        }
    }
}

/// Result of the most recent connection test. Absent until the first test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Success,
    Failed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Success => "success",
            ConnectionStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_type_round_trip() {
        for dataset in DatasetType::ALL {
            let parsed: DatasetType = dataset.as_str().parse().unwrap();
            assert_eq!(parsed, dataset);
        }
    }

    #[test]
    fn test_unknown_dataset_type_rejected() {
        let result = "incidents".parse::<DatasetType>();
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_trigger_default_is_manual() {
        assert_eq!(SyncTrigger::default(), SyncTrigger::Manual);
    }
}
