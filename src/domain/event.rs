//! Bus payloads exchanged between intake, coordinator and observers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    employee::{Employee, EmployeeId},
    fsm::{Decision, Trigger}
};

/// Request to create an employee, published on the add topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAddEvent {
    pub employee: Employee
}

/// Request to move an employee through the lifecycle, published on the change-state topic
///
/// Also serves as the acknowledgment handed back to the submitter: it confirms
/// the request was queued, not that the transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeChangeStateEvent {
    pub employee_id: EmployeeId,
    pub event:       Trigger
}

/// Published record of a creation or of a transition attempt
///
/// `event` and `result` are both absent for a creation; for a transition
/// attempt `employee` carries the state after the attempt, which is the
/// unchanged state when the trigger was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub outcome_id: String,
    pub timestamp:  DateTime<Utc>,
    pub event:      Option<Trigger>,
    pub result:     Option<Decision>,
    pub employee:   Employee
}

impl TransitionOutcome {
    pub fn created(employee: Employee) -> Self {
        Self::build(None, None, employee)
    }

    pub fn attempted(trigger: Trigger, decision: Decision, employee: Employee) -> Self {
        Self::build(Some(trigger), Some(decision), employee)
    }

    fn build(event: Option<Trigger>, result: Option<Decision>, employee: Employee) -> Self {
        Self { outcome_id: Uuid::new_v4().to_string(), timestamp: Utc::now(), event, result, employee }
    }

    pub fn employee_id(&self) -> EmployeeId {
        self.employee.id
    }

    pub fn is_creation(&self) -> bool {
        self.event.is_none()
    }

    pub fn is_accepted(&self) -> bool {
        self.result == Some(Decision::Accepted)
    }

    /// Short label for observers
    pub fn describe(&self) -> &'static str {
        if self.is_creation() { "Employee creation" } else { "State change attempt" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::employee::{EmployeeDraft, EmployeeState};

    #[test]
    fn test_creation_outcome_wire_format() {
        let employee = Employee::new(1, EmployeeDraft::new("Jane Roe", "permanent", 20));
        let outcome = TransitionOutcome::created(employee);

        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value["event"].is_null());
        assert!(value["result"].is_null());
        assert_eq!(value["employee"]["state"], "ADDED");
        assert_eq!(outcome.describe(), "Employee creation");
    }

    #[test]
    fn test_attempt_outcome_wire_format() {
        let mut employee = Employee::new(3, EmployeeDraft::new("Jane Roe", "", 20));
        employee.state = EmployeeState::InCheck;
        let outcome = TransitionOutcome::attempted(Trigger::Check, Decision::Accepted, employee);

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["event"], "CHECK");
        assert_eq!(value["result"], "ACCEPTED");
        assert_eq!(value["employee"]["id"], 3);

        let decoded: TransitionOutcome = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, outcome);
        assert!(decoded.is_accepted());
    }

    #[test]
    fn test_change_state_event_accepts_intake_shape() {
        let event: EmployeeChangeStateEvent =
            serde_json::from_str(r#"{"employee_id": 12, "event": "APPROVE"}"#).unwrap();

        assert_eq!(event, EmployeeChangeStateEvent { employee_id: 12, event: Trigger::Approve });
    }
}
