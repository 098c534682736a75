use thiserror::Error;

use crate::domain::employee::EmployeeId;

/// Common error types for the employee workflow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A request referenced an employee that storage does not know
    #[error("cannot find employee with id={0}")]
    EmployeeNotFound(EmployeeId),

    /// Storage adapter failures (I/O, corrupt records)
    #[error("{0}")]
    Storage(String),

    /// Publishing to the bus did not complete within the configured timeout
    #[error("{0}")]
    PublishTimeout(String),

    /// Bus transport errors
    #[error("{0}")]
    Bus(String),

    /// Intake validation errors
    #[error("{0}")]
    Validation(String),

    /// Configuration related errors
    #[error("{0}")]
    Configuration(String),

    /// Serialization/deserialization errors
    #[error("{0}")]
    Serialization(String),

    /// Spawn errors
    #[error("{0}")]
    Spawn(String),

    /// Actor call timeout errors
    #[error("{0}")]
    Timeout(String),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String)
}

impl WorkflowError {
    /// Errors the pipeline logs and drops instead of surfacing as faults
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WorkflowError::EmployeeNotFound(_) | WorkflowError::PublishTimeout(_))
    }
}

/// Convert from anyhow::Error
impl From<anyhow::Error> for WorkflowError {
    fn from(err: anyhow::Error) -> Self {
        WorkflowError::Generic(err.to_string())
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for WorkflowError {
    fn from(err: std::io::Error) -> Self {
        WorkflowError::Configuration(err.to_string())
    }
}

/// Convert from serde_yaml::Error
impl From<serde_yaml::Error> for WorkflowError {
    fn from(err: serde_yaml::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Serialization(err.to_string())
    }
}

/// Convert from rocksdb::Error
impl From<rocksdb::Error> for WorkflowError {
    fn from(err: rocksdb::Error) -> Self {
        WorkflowError::Storage(err.to_string())
    }
}

/// Convert from ractor::SpawnErr
impl From<ractor::SpawnErr> for WorkflowError {
    fn from(err: ractor::SpawnErr) -> Self {
        WorkflowError::Spawn(err.to_string())
    }
}
