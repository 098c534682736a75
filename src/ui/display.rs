//! Display utilities for formatted output

use tabled::{Table, Tabled, settings::Style};

use crate::domain::{
    employee::EmployeeState,
    event::TransitionOutcome,
    fsm::{self, TRANSITIONS}
};

/// One published outcome as a table row
#[derive(Debug, Clone, Tabled)]
pub struct OutcomeRow {
    #[tabled(rename = "Time")]
    pub time:     String,
    #[tabled(rename = "Employee")]
    pub employee: String,
    #[tabled(rename = "Kind")]
    pub kind:     &'static str,
    #[tabled(rename = "Event")]
    pub event:    String,
    #[tabled(rename = "Result")]
    pub result:   String,
    #[tabled(rename = "State")]
    pub state:    EmployeeState
}

impl From<&TransitionOutcome> for OutcomeRow {
    fn from(outcome: &TransitionOutcome) -> Self {
        Self {
            time:     outcome.timestamp.format("%H:%M:%S%.3f").to_string(),
            employee: outcome.employee.to_string(),
            kind:     outcome.describe(),
            event:    outcome.event.map(|trigger| trigger.to_string()).unwrap_or_else(|| "-".to_string()),
            result:   outcome.result.map(|decision| decision.to_string()).unwrap_or_else(|| "-".to_string()),
            state:    outcome.employee.state
        }
    }
}

/// One lifecycle transition as a table row
#[derive(Debug, Clone, Tabled)]
pub struct TransitionRow {
    #[tabled(rename = "From")]
    pub from:      EmployeeState,
    #[tabled(rename = "Trigger")]
    pub trigger:   String,
    #[tabled(rename = "To")]
    pub to:        EmployeeState,
    #[tabled(rename = "Then allowed")]
    pub available: String
}

/// Render outcomes in the order they were observed
pub fn outcome_table(outcomes: &[TransitionOutcome]) -> String {
    Table::new(outcomes.iter().map(OutcomeRow::from)).with(Style::rounded()).to_string()
}

/// Render the lifecycle transition table
pub fn transition_table() -> String {
    let rows = TRANSITIONS.iter().map(|(from, trigger, to)| TransitionRow {
        from:      *from,
        trigger:   trigger.to_string(),
        to:        *to,
        available: join(&fsm::available_triggers(*to))
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Print the outcome table with a short summary line
pub fn show_outcomes(title: &str, outcomes: &[TransitionOutcome]) {
    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    let created = outcomes.iter().filter(|o| o.is_creation()).count();

    println!("{}", title);
    println!("{}", outcome_table(outcomes));
    println!(
        "{} outcomes: {} created, {} accepted, {} denied",
        outcomes.len(),
        created,
        accepted,
        outcomes.len() - created - accepted
    );
}

fn join(triggers: &[fsm::Trigger]) -> String {
    if triggers.is_empty() {
        return "-".to_string();
    }
    triggers.iter().map(|trigger| trigger.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        employee::{Employee, EmployeeDraft},
        fsm::{Decision, Trigger}
    };

    #[test]
    fn test_transition_table_lists_every_transition() {
        let table = transition_table();

        for (from, trigger, to) in TRANSITIONS {
            assert!(table.contains(from.as_str()));
            assert!(table.contains(trigger.as_str()));
            assert!(table.contains(to.as_str()));
        }
        assert!(table.contains("Then allowed"));
    }

    #[test]
    fn test_outcome_row_marks_creations() {
        let employee = Employee::new(3, EmployeeDraft::new("Jane Roe", "", 30));
        let created = OutcomeRow::from(&TransitionOutcome::created(employee.clone()));
        let denied = OutcomeRow::from(&TransitionOutcome::attempted(Trigger::Approve, Decision::Denied, employee));

        assert_eq!(created.event, "-");
        assert_eq!(created.result, "-");
        assert_eq!(denied.event, "APPROVE");
        assert_eq!(denied.result, Decision::Denied.to_string());
        assert_eq!(denied.state, EmployeeState::Added);
    }
}
