//! Employee approval state machine
//!
//! The machine is a pure function over `(state, trigger)`. Nothing is
//! instantiated per employee: the current state comes from storage, the
//! decision comes from [`evaluate`], and the caller persists the result.

use std::{
    fmt::{self, Display},
    str::FromStr
};

use serde::{Deserialize, Serialize};

use crate::domain::{employee::EmployeeState, error::WorkflowError};

/// A named request for a lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    Check,
    Reject,
    Approve,
    Activate
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [Trigger::Check, Trigger::Reject, Trigger::Approve, Trigger::Activate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Check => "CHECK",
            Trigger::Reject => "REJECT",
            Trigger::Approve => "APPROVE",
            Trigger::Activate => "ACTIVATE"
        }
    }
}

impl Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive, so `check`, `Check` and `CHECK` all name the same trigger
impl FromStr for Trigger {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Trigger::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == upper)
            .ok_or_else(|| WorkflowError::Validation(format!("unknown trigger: {}", s)))
    }
}

/// Result of evaluating a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accepted,
    Denied
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accepted => "ACCEPTED",
            Decision::Denied => "DENIED"
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision plus the state the employee should be in afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub decision:   Decision,
    pub next_state: EmployeeState
}

impl Transition {
    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accepted
    }
}

/// Every legal `(source, trigger, target)` transition
pub const TRANSITIONS: [(EmployeeState, Trigger, EmployeeState); 4] = [
    (EmployeeState::Added, Trigger::Check, EmployeeState::InCheck),
    (EmployeeState::InCheck, Trigger::Reject, EmployeeState::Added),
    (EmployeeState::InCheck, Trigger::Approve, EmployeeState::Approved),
    (EmployeeState::Approved, Trigger::Activate, EmployeeState::Active)
];

/// Decide whether `trigger` moves an employee out of `current`.
///
/// Pairs missing from [`TRANSITIONS`] are denied and leave the state as is.
pub fn evaluate(current: EmployeeState, trigger: Trigger) -> Transition {
    TRANSITIONS
        .iter()
        .find(|(source, on, _)| *source == current && *on == trigger)
        .map(|(_, _, target)| Transition { decision: Decision::Accepted, next_state: *target })
        .unwrap_or(Transition { decision: Decision::Denied, next_state: current })
}

/// Triggers that would be accepted from `state`
pub fn available_triggers(state: EmployeeState) -> Vec<Trigger> {
    TRANSITIONS.iter().filter(|(source, _, _)| *source == state).map(|(_, trigger, _)| *trigger).collect()
}
