//! Scenario files for the `run` command
//!
//! A scenario is a list of intake steps replayed against a running system.
//! Employees are referred to by an alias chosen in their `add` step, or by a
//! raw id.

use std::{collections::HashMap, fs, path::Path, time::Duration};

use futures::StreamExt;
use serde::{Deserialize, Deserializer, Serialize, de};
use tracing::{Level, event};

use crate::{
    domain::{
        constant::intake,
        employee::{EmployeeDraft, EmployeeId},
        error::WorkflowError,
        event::TransitionOutcome,
        fsm::Trigger
    },
    port::bus::StartPosition,
    service::{employee::EmployeeService, gateway::StatusSubscription}
};

const APPROVAL_WALK: &str = include_str!("../../demos/approval-walk.yaml");

/// Employee reference inside a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmployeeRef {
    Id(EmployeeId),
    Alias(String)
}

/// One scenario step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStep {
    /// Create an employee and wait for its creation outcome
    Add {
        alias: String,
        #[serde(flatten)]
        draft: EmployeeDraft
    },
    /// Submit a trigger without waiting for its outcome
    Trigger {
        employee: EmployeeRef,
        #[serde(deserialize_with = "trigger_from_text")]
        event:    Trigger
    },
    /// Sleep before the next step
    Pause { millis: u64 }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name:        String,
    #[serde(default)]
    pub description: String,
    /// Written as single-key maps (`- add: {...}`) rather than YAML tags
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps:       Vec<ScenarioStep>
}

impl Scenario {
    pub fn from_yaml(content: &str) -> Result<Self, WorkflowError> {
        serde_yaml::from_str(content).map_err(|e| WorkflowError::Validation(format!("Invalid scenario: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path).map_err(|e| {
            WorkflowError::Configuration(format!("Failed to read scenario {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// The scenario run when none is given
    pub fn approval_walk() -> Result<Self, WorkflowError> {
        Self::from_yaml(APPROVAL_WALK)
    }

    /// Replay every step through `service` and collect the outcomes observed meanwhile
    ///
    /// Collection ends once no outcome arrives for `settle`. An `add` step fails
    /// when its creation outcome takes longer than `step_timeout`.
    pub async fn run(
        &self,
        service: &EmployeeService,
        settle: Duration,
        step_timeout: Duration
    ) -> Result<Vec<TransitionOutcome>, WorkflowError> {
        let mut observed = service.gateway().subscribe_all(StartPosition::Latest).await?;
        let mut outcomes = Vec::new();
        let mut aliases = HashMap::new();

        for step in &self.steps {
            match step {
                ScenarioStep::Add { alias, draft } => {
                    let employee = service.create_employee(draft.clone()).await?;
                    aliases.insert(alias.clone(), employee.id);

                    // Triggers arrive on another topic, so the creation must land first
                    loop {
                        let outcome = next_within(&mut observed, step_timeout).await?;
                        let created = outcome.is_creation() && outcome.employee_id() == employee.id;
                        outcomes.push(outcome);
                        if created {
                            break;
                        }
                    }
                }
                ScenarioStep::Trigger { employee, event } => {
                    let employee_id = resolve(&aliases, employee)?;
                    service.submit_trigger(employee_id, *event).await?;
                }
                ScenarioStep::Pause { millis } => tokio::time::sleep(Duration::from_millis(*millis)).await
            }
        }

        while let Ok(Some(outcome)) = tokio::time::timeout(settle, observed.next()).await {
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}

/// Trigger names in scenarios are case-insensitive
fn trigger_from_text<'de, D>(deserializer: D) -> Result<Trigger, D::Error>
where
    D: Deserializer<'de>
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(de::Error::custom)
}

fn resolve(aliases: &HashMap<String, EmployeeId>, employee: &EmployeeRef) -> Result<EmployeeId, WorkflowError> {
    match employee {
        EmployeeRef::Id(id) => Ok(*id),
        EmployeeRef::Alias(alias) => aliases.get(alias).copied().ok_or_else(|| {
            event!(Level::WARN, event = intake::RECORD_REJECTED, alias = %alias);
            WorkflowError::Validation(format!("unknown employee alias '{}'", alias))
        })
    }
}

async fn next_within(observed: &mut StatusSubscription, timeout: Duration) -> Result<TransitionOutcome, WorkflowError> {
    match tokio::time::timeout(timeout, observed.next()).await {
        Ok(Some(outcome)) => Ok(outcome),
        Ok(None) => Err(WorkflowError::Bus("status stream ended".to_string())),
        Err(_) => Err(WorkflowError::Timeout(format!("no outcome within {}ms", timeout.as_millis())))
    }
}
