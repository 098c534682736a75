//! Application configuration
//!
//! Every field has a default, so an empty or missing YAML file yields a
//! working in-memory setup.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    adapter::storage::StorageType,
    domain::{constant::topic, error::WorkflowError},
    port::bus::StartPosition
};

/// Bus topic names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Employee creation intake
    pub add:          String,
    /// Transition request intake
    pub change_state: String,
    /// Transition outcome broadcast
    pub status:       String
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            add:          topic::EMPLOYEE_ADD.to_string(),
            change_state: topic::EMPLOYEE_CHANGE_STATE.to_string(),
            status:       topic::EMPLOYEE_STATUS.to_string()
        }
    }
}

/// In-process bus sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Records a live consumer may fall behind before it lags
    pub capacity:  usize,
    /// Records retained per topic for replay
    pub retention: usize
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 1024, retention: 10_000 }
    }
}

/// Application configuration for storage, bus and runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub topics:               TopicConfig,
    pub bus:                  BusConfig,
    /// Upper bound on a single bus publish
    pub publish_timeout_secs: u64,
    /// Upper bound on a request/reply round trip with the coordinator
    pub call_timeout_secs:    u64,
    /// Storage backend type
    pub storage_type:         StorageType,
    /// Database directory (for RocksDB)
    pub database_path:        PathBuf,
    /// Where status subscriptions start reading
    pub status_start:         StartPosition
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topics:               TopicConfig::default(),
            bus:                  BusConfig::default(),
            publish_timeout_secs: 5,
            call_timeout_secs:    30,
            storage_type:         StorageType::InMemory,
            database_path:        default_database_path(),
            status_start:         StartPosition::Latest
        }
    }
}

fn default_database_path() -> PathBuf {
    ProjectDirs::from("org", "employee-workflow", "employee-workflow")
        .map(|dirs| dirs.data_dir().join("rocksdb"))
        .unwrap_or_else(|| PathBuf::from("employee-workflow-db"))
}

impl AppConfig {
    /// Load configuration from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, WorkflowError> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    WorkflowError::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
                })?;
                Self::from_yaml(&content)?
            }
            None => Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, WorkflowError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content)
            .map_err(|e| WorkflowError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.publish_timeout_secs == 0 {
            return Err(WorkflowError::Configuration("publish_timeout_secs must be greater than 0".to_string()));
        }

        let topics = [&self.topics.add, &self.topics.change_state, &self.topics.status];
        if topics.iter().any(|t| t.trim().is_empty()) {
            return Err(WorkflowError::Configuration("topic names must not be empty".to_string()));
        }
        if topics[0] == topics[1] || topics[0] == topics[2] || topics[1] == topics[2] {
            return Err(WorkflowError::Configuration("add, change_state and status topics must differ".to_string()));
        }

        Ok(())
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Create the database directory if the backend needs one
    pub fn ensure_dirs_exist(&self) -> Result<(), WorkflowError> {
        if self.storage_type == StorageType::RocksDb {
            fs::create_dir_all(&self.database_path).map_err(|e| WorkflowError::Configuration(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.topics.status, "employee-status");
        assert_eq!(config.publish_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = AppConfig::from_yaml(
            "publish_timeout_secs: 2\nstorage_type: rocksdb\nstatus_start: earliest\ntopics:\n  status: outcomes\n"
        )
        .unwrap();

        assert_eq!(config.publish_timeout_secs, 2);
        assert_eq!(config.storage_type, StorageType::RocksDb);
        assert_eq!(config.status_start, StartPosition::Earliest);
        assert_eq!(config.topics.status, "outcomes");
        assert_eq!(config.topics.add, "employee-add");
        assert_eq!(config.bus, BusConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = AppConfig { publish_timeout_secs: 0, ..AppConfig::default() };
        assert!(matches!(config.validate(), Err(WorkflowError::Configuration(_))));

        let mut config = AppConfig::default();
        config.topics.status = config.topics.add.clone();
        assert!(matches!(config.validate(), Err(WorkflowError::Configuration(_))));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "call_timeout_secs: 3\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.call_timeout(), Duration::from_secs(3));

        assert!(matches!(AppConfig::load(Some(&dir.path().join("missing.yaml"))), Err(WorkflowError::Configuration(_))));
    }
}
