//! Storage implementations for employee records
//!
//! This module provides both in-memory and persistent (RocksDB) implementations
//! of the EmployeeStorage trait.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use rocksdb::{DB, Direction, IteratorMode, Options};
use tokio::sync::RwLock;
use tracing::{Level, event};

use crate::{
    domain::{
        constant::storage,
        employee::{Employee, EmployeeId},
        error::WorkflowError
    },
    port::storage::EmployeeStorage
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
pub enum StorageType {
    #[default]
    #[serde(rename = "inmemory")]
    #[value(name = "inmemory")]
    InMemory,
    #[serde(rename = "rocksdb")]
    #[value(name = "rocksdb")]
    RocksDb
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::InMemory => "inmemory",
            StorageType::RocksDb => "rocksdb"
        }
    }
}

impl std::str::FromStr for StorageType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inmemory" => Ok(StorageType::InMemory),
            "rocksdb" => Ok(StorageType::RocksDb),
            other => Err(WorkflowError::Configuration(format!("Unknown storage backend: {}", other)))
        }
    }
}

/// In-memory employee storage
///
/// Suitable for development and testing; data is lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryEmployeeStorage {
    employees: Arc<RwLock<HashMap<EmployeeId, Employee>>>
}

impl InMemoryEmployeeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored employees
    pub async fn len(&self) -> usize {
        self.employees.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.employees.read().await.is_empty()
    }
}

#[async_trait]
impl EmployeeStorage for InMemoryEmployeeStorage {
    async fn upsert(&self, employee: Employee) -> Result<Employee, WorkflowError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id, employee.clone());

        event!(Level::DEBUG, event = storage::EMPLOYEE_UPSERTED, employee_id = %employee.id, state = %employee.state);
        Ok(employee)
    }

    async fn lookup(&self, id: EmployeeId) -> Result<Option<Employee>, WorkflowError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id).cloned())
    }

    async fn highest_id(&self) -> Result<EmployeeId, WorkflowError> {
        let employees = self.employees.read().await;
        Ok(employees.keys().copied().max().unwrap_or(0))
    }
}

/// RocksDB-based employee storage
///
/// Storage layout:
/// - `employee:{id:020}` -> JSON encoded Employee
///
/// Ids are zero padded so that key order equals numeric order, which keeps
/// `highest_id` a single reverse seek.
pub struct RocksDbEmployeeStorage {
    db: Arc<DB>
}

const EMPLOYEE_PREFIX: &str = "employee:";

fn employee_key(id: EmployeeId) -> String {
    format!("{}{:020}", EMPLOYEE_PREFIX, id)
}

impl RocksDbEmployeeStorage {
    /// Open (or create) a database at `path`
    pub fn open(path: &Path) -> Result<Self, WorkflowError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let db = DB::open(&opts, path)
            .map_err(|e| WorkflowError::Storage(format!("Failed to open RocksDB at {}: {}", path.display(), e)))?;

        event!(Level::DEBUG, event = storage::STORAGE_OPENED, backend = "rocksdb", path = %path.display());
        Ok(Self::from_db(Arc::new(db)))
    }

    /// Creates storage from an existing DB instance
    pub fn from_db(db: Arc<DB>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EmployeeStorage for RocksDbEmployeeStorage {
    async fn upsert(&self, employee: Employee) -> Result<Employee, WorkflowError> {
        let db = self.db.clone();
        let data = serde_json::to_vec(&employee)?;
        let key = employee_key(employee.id);

        tokio::task::spawn_blocking(move || db.put(key.as_bytes(), data))
            .await
            .map_err(|e| WorkflowError::Storage(format!("Failed to write employee: {}", e)))?
            .map_err(|e| WorkflowError::Storage(format!("Failed to write to RocksDB: {}", e)))?;

        event!(Level::DEBUG, event = storage::EMPLOYEE_UPSERTED, employee_id = %employee.id, state = %employee.state);
        Ok(employee)
    }

    async fn lookup(&self, id: EmployeeId) -> Result<Option<Employee>, WorkflowError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<Employee>, WorkflowError> {
            match db.get(employee_key(id).as_bytes()) {
                Ok(Some(data)) => serde_json::from_slice(&data)
                    .map(Some)
                    .map_err(|e| WorkflowError::Storage(format!("Failed to deserialize employee {}: {}", id, e))),
                Ok(None) => Ok(None),
                Err(e) => Err(WorkflowError::Storage(format!("Failed to read from RocksDB: {}", e)))
            }
        })
        .await
        .map_err(|e| WorkflowError::Storage(format!("Failed to read employee: {}", e)))?
    }

    async fn highest_id(&self) -> Result<EmployeeId, WorkflowError> {
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<EmployeeId, WorkflowError> {
            // Any byte above ':' sorts after every padded id under the prefix
            let upper = format!("{};", EMPLOYEE_PREFIX.trim_end_matches(':'));
            let mut iter = db.iterator(IteratorMode::From(upper.as_bytes(), Direction::Reverse));

            match iter.next() {
                Some(item) => {
                    let (key, _) = item?;
                    let key = String::from_utf8_lossy(&key);
                    match key.strip_prefix(EMPLOYEE_PREFIX) {
                        Some(id) => id
                            .parse::<EmployeeId>()
                            .map_err(|e| WorkflowError::Storage(format!("Corrupt employee key {}: {}", key, e))),
                        None => Ok(0)
                    }
                }
                None => Ok(0)
            }
        })
        .await
        .map_err(|e| WorkflowError::Storage(format!("Failed to scan employees: {}", e)))?
    }
}

/// Factory for creating employee storage based on configuration
pub struct StorageFactory;

impl StorageFactory {
    pub fn create(storage_type: StorageType, db_path: Option<&Path>) -> Result<Arc<dyn EmployeeStorage>, WorkflowError> {
        match storage_type {
            StorageType::InMemory => Ok(Arc::new(InMemoryEmployeeStorage::new())),
            StorageType::RocksDb => {
                let path = db_path
                    .ok_or_else(|| WorkflowError::Configuration("RocksDB storage requires a database path".to_string()))?;
                Ok(Arc::new(RocksDbEmployeeStorage::open(path)?))
            }
        }
    }
}
