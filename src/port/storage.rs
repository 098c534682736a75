use async_trait::async_trait;

use crate::domain::{
    employee::{Employee, EmployeeId},
    error::WorkflowError
};

/// Port for the key/value store that owns employee records
#[async_trait]
pub trait EmployeeStorage: Send + Sync + 'static {
    /// Insert or replace the employee stored under `employee.id`
    async fn upsert(&self, employee: Employee) -> Result<Employee, WorkflowError>;

    /// Get the employee stored under `id`, if any
    async fn lookup(&self, id: EmployeeId) -> Result<Option<Employee>, WorkflowError>;

    /// Highest id ever stored, 0 when empty
    async fn highest_id(&self) -> Result<EmployeeId, WorkflowError>;
}
