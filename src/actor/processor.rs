//! EmployeeProcessor Actor
//!
//! One processor exists per employee id with work in flight. The actor
//! mailbox is the per-employee critical section: a request is fully loaded,
//! decided, persisted and published before the next one for the same id is
//! looked at, whichever order the bus delivered them in.

use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use tracing::{Level, event};

use crate::{
    AppContext,
    actor::message::{CoordinatorMessage, EmployeeProcessorMessage, OutcomeReply},
    domain::{
        constant::processor,
        employee::{Employee, EmployeeId, EmployeeState},
        error::WorkflowError,
        event::TransitionOutcome,
        fsm::{self, Trigger}
    },
    port::storage::EmployeeStorage,
    service::publisher::OutcomePublisher
};

/// EmployeeProcessor Actor State
pub struct EmployeeProcessorState {
    pub employee_id: EmployeeId,
    pub storage:     Arc<dyn EmployeeStorage>,
    pub publisher:   Arc<OutcomePublisher>,
    pub coordinator: ActorRef<CoordinatorMessage>,
    /// Requests handled so far, reported back so the coordinator knows when the mailbox is empty
    pub processed:   u64
}

/// EmployeeProcessor Actor - serializes all work for a single employee
pub struct EmployeeProcessor;

#[async_trait::async_trait]
impl Actor for EmployeeProcessor {
    type Arguments = (EmployeeId, Arc<AppContext>, ActorRef<CoordinatorMessage>);
    type Msg = EmployeeProcessorMessage;
    type State = EmployeeProcessorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (employee_id, app_context, coordinator): Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = processor::PROCESSOR_STARTED, employee_id = %employee_id);

        Ok(EmployeeProcessorState {
            employee_id,
            storage: app_context.storage.clone(),
            publisher: app_context.publisher.clone(),
            coordinator,
            processed: 0
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            EmployeeProcessorMessage::Create { employee, reply } => {
                let result = create_employee(employee, state.storage.as_ref(), &state.publisher).await;
                respond(state.employee_id, reply, result);
            }
            EmployeeProcessorMessage::ApplyTrigger { trigger, reply } => {
                let result =
                    apply_trigger(state.employee_id, trigger, state.storage.as_ref(), &state.publisher).await;
                respond(state.employee_id, reply, result);
            }
        }

        state.processed += 1;
        if let Err(e) = state
            .coordinator
            .cast(CoordinatorMessage::ProcessorIdle { employee_id: state.employee_id, processed: state.processed })
        {
            event!(Level::ERROR, event = processor::REPLY_FAILED, employee_id = %state.employee_id, error = %e);
        }

        Ok(())
    }
}

/// Store a new employee in its initial state and announce it
pub async fn create_employee(
    mut employee: Employee,
    storage: &dyn EmployeeStorage,
    publisher: &OutcomePublisher
) -> Result<TransitionOutcome, WorkflowError> {
    employee.state = EmployeeState::Added;
    let employee = storage.upsert(employee).await?;

    event!(Level::DEBUG, event = processor::EMPLOYEE_CREATED, employee_id = %employee.id);

    let outcome = TransitionOutcome::created(employee);
    publisher.notify(&outcome).await;
    Ok(outcome)
}

/// Load, decide, persist on acceptance, publish
///
/// A denied trigger still publishes an outcome carrying the unchanged
/// employee. Nothing is published when the employee is unknown or the
/// write fails.
pub async fn apply_trigger(
    employee_id: EmployeeId,
    trigger: Trigger,
    storage: &dyn EmployeeStorage,
    publisher: &OutcomePublisher
) -> Result<TransitionOutcome, WorkflowError> {
    event!(Level::DEBUG, event = processor::TRIGGER_RECEIVED, employee_id = %employee_id, trigger = %trigger);

    let mut employee = storage.lookup(employee_id).await?.ok_or(WorkflowError::EmployeeNotFound(employee_id))?;

    let source = employee.state;
    let transition = fsm::evaluate(source, trigger);

    event!(Level::DEBUG, event = processor::TRIGGER_EVALUATED, employee_id = %employee_id, trigger = %trigger,
           from = %source, to = %transition.next_state, decision = %transition.decision);

    if transition.is_accepted() {
        employee.state = transition.next_state;
        employee = storage.upsert(employee).await?;
    }

    let outcome = TransitionOutcome::attempted(trigger, transition.decision, employee);
    publisher.notify(&outcome).await;
    Ok(outcome)
}

/// Hand the result to a waiting caller, or log what nobody will see
fn respond(employee_id: EmployeeId, reply: OutcomeReply, result: Result<TransitionOutcome, WorkflowError>) {
    match reply {
        Some(reply) => {
            if let Err(e) = reply.send(result) {
                event!(Level::ERROR, event = processor::REPLY_FAILED, employee_id = %employee_id, error = %e);
            }
        }
        None => match result {
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                event!(Level::WARN, event = processor::REQUEST_DROPPED, employee_id = %employee_id, error = %e);
            }
            Err(e) => {
                event!(Level::ERROR, event = processor::REQUEST_FAILED, employee_id = %employee_id, error = %e);
            }
        }
    }
}
