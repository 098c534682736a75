//! Employee domain types
//!
//! The employee is the business object whose approval lifecycle is tracked.
//! Storage owns the canonical copy; everything else works on snapshots.

use std::{
    fmt::{self, Display},
    sync::atomic::{AtomicU64, Ordering}
};

use serde::{Deserialize, Serialize};

use crate::domain::error::WorkflowError;

/// Unique, immutable employee identifier
pub type EmployeeId = u64;

/// Youngest age accepted at intake
pub const MINIMUM_AGE: u32 = 18;

/// Lifecycle state of an employee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeState {
    /// Initial state, also the target of a rejection
    #[default]
    Added,
    InCheck,
    Approved,
    /// No outgoing transitions
    Active
}

impl EmployeeState {
    pub const ALL: [EmployeeState; 4] =
        [EmployeeState::Added, EmployeeState::InCheck, EmployeeState::Approved, EmployeeState::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeState::Added => "ADDED",
            EmployeeState::InCheck => "IN_CHECK",
            EmployeeState::Approved => "APPROVED",
            EmployeeState::Active => "ACTIVE"
        }
    }
}

impl Display for EmployeeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An employee as persisted by storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id:            EmployeeId,
    pub state:         EmployeeState,
    pub name:          String,
    #[serde(default)]
    pub contract_info: String,
    pub age:           u32
}

impl Employee {
    /// Build a freshly created employee from an intake draft
    pub fn new(id: EmployeeId, draft: EmployeeDraft) -> Self {
        Self { id, state: EmployeeState::Added, name: draft.name, contract_info: draft.contract_info, age: draft.age }
    }
}

impl Display for Employee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} [{}]", self.id, self.name, self.state)
    }
}

/// Employee data as submitted at intake, before an id is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDraft {
    pub name:          String,
    #[serde(default)]
    pub contract_info: String,
    pub age:           u32
}

impl EmployeeDraft {
    pub fn new(name: impl Into<String>, contract_info: impl Into<String>, age: u32) -> Self {
        Self { name: name.into(), contract_info: contract_info.into(), age }
    }

    /// Field rules enforced at the intake boundary
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowError::Validation("employee name must not be blank".to_string()));
        }

        if self.age < MINIMUM_AGE {
            return Err(WorkflowError::Validation(format!(
                "employee age must be at least {}, got {}",
                MINIMUM_AGE, self.age
            )));
        }

        Ok(())
    }
}

/// Strictly increasing id source
///
/// Seeded with the highest id storage already holds so ids survive restarts
/// of a persistent backend without reuse.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64
}

impl IdAllocator {
    pub fn starting_after(last: EmployeeId) -> Self {
        Self { last: AtomicU64::new(last) }
    }

    pub fn next_id(&self) -> EmployeeId {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_id(&self) -> EmployeeId {
        self.last.load(Ordering::SeqCst)
    }
}
