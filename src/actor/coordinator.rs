//! Coordinator Actor - routes employee requests to per-employee processors
//!
//! The Coordinator owns the map from employee id to EmployeeProcessor:
//! - Spawns a processor the first time an id has work
//! - Forwards creations and triggers without waiting on them, so different
//!   employees progress in parallel
//! - Retires processors whose mailbox has drained

use std::{collections::HashMap, sync::Arc, time::Duration};

use ractor::{
    Actor, ActorProcessingErr, ActorRef, SpawnErr,
    rpc::{CallResult, call}
};
use tracing::{Level, event};

use crate::{
    AppContext,
    actor::{
        message::{CoordinatorMessage, CoordinatorStats, EmployeeProcessorMessage, OutcomeReply},
        processor::EmployeeProcessor
    },
    domain::{
        constant::coordinator,
        employee::{Employee, EmployeeId},
        error::WorkflowError,
        event::TransitionOutcome,
        fsm::Trigger
    }
};

/// A live processor and how many requests were sent to it
struct ProcessorSlot {
    processor:  ActorRef<EmployeeProcessorMessage>,
    dispatched: u64
}

/// Coordinator Actor State
pub struct CoordinatorState {
    processors:  HashMap<EmployeeId, ProcessorSlot>,
    app_context: Arc<AppContext>,
    stats:       CoordinatorStats
}

/// Coordinator Actor - one per system, the only writer of the processor map
pub struct Coordinator;

#[async_trait::async_trait]
impl Actor for Coordinator {
    type Arguments = Arc<AppContext>;
    type Msg = CoordinatorMessage;
    type State = CoordinatorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        app_context: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = coordinator::COORDINATOR_STARTED);

        Ok(CoordinatorState { processors: HashMap::new(), app_context, stats: CoordinatorStats::default() })
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        for (_, slot) in state.processors.drain() {
            slot.processor.stop(None);
        }

        event!(Level::DEBUG, event = coordinator::COORDINATOR_STOPPED,
               processors_spawned = %state.stats.processors_spawned,
               processors_retired = %state.stats.processors_retired);
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CoordinatorMessage::CreateEmployee { employee, reply } => {
                let employee_id = employee.id;
                state.stats.creations_routed += 1;
                event!(Level::DEBUG, event = coordinator::CREATE_DISPATCHED, employee_id = %employee_id);

                self.dispatch(myself, employee_id, EmployeeProcessorMessage::Create { employee, reply }, state).await;
            }
            CoordinatorMessage::ApplyTrigger { employee_id, trigger, reply } => {
                state.stats.triggers_routed += 1;
                event!(Level::DEBUG, event = coordinator::TRIGGER_DISPATCHED,
                       employee_id = %employee_id, trigger = %trigger);

                self.dispatch(myself, employee_id, EmployeeProcessorMessage::ApplyTrigger { trigger, reply }, state)
                    .await;
            }
            CoordinatorMessage::ProcessorIdle { employee_id, processed } => {
                self.handle_processor_idle(employee_id, processed, state);
            }
            CoordinatorMessage::GetStats { reply } => {
                let stats = CoordinatorStats { active_processors: state.processors.len(), ..state.stats.clone() };
                if let Err(e) = reply.send(stats) {
                    event!(Level::ERROR, event = coordinator::DISPATCH_FAILED, error = %e);
                }
            }
        }

        Ok(())
    }
}

impl Coordinator {
    /// Send a request to the processor owning `employee_id`, spawning it if needed
    async fn dispatch(
        &self,
        myself: ActorRef<CoordinatorMessage>,
        employee_id: EmployeeId,
        message: EmployeeProcessorMessage,
        state: &mut CoordinatorState
    ) {
        if !state.processors.contains_key(&employee_id) {
            match Self::spawn_processor(employee_id, state.app_context.clone(), myself).await {
                Ok(processor) => {
                    state.processors.insert(employee_id, ProcessorSlot { processor, dispatched: 0 });
                    state.stats.processors_spawned += 1;
                    event!(Level::DEBUG, event = coordinator::PROCESSOR_SPAWNED, employee_id = %employee_id,
                           active_processors = %state.processors.len());
                }
                Err(e) => {
                    event!(Level::ERROR, event = coordinator::PROCESSOR_SPAWN_FAILED,
                           employee_id = %employee_id, error = %e);
                    fail_request(message, WorkflowError::Spawn(format!("Failed to spawn processor: {}", e)));
                    return;
                }
            }
        }

        let Some(slot) = state.processors.get_mut(&employee_id) else {
            return;
        };

        match slot.processor.cast(message) {
            Ok(()) => slot.dispatched += 1,
            Err(e) => {
                // The processor died; forget it so the next request gets a fresh one
                event!(Level::ERROR, event = coordinator::DISPATCH_FAILED, employee_id = %employee_id, error = %e);
                state.processors.remove(&employee_id);
            }
        }
    }

    async fn spawn_processor(
        employee_id: EmployeeId,
        app_context: Arc<AppContext>,
        coordinator: ActorRef<CoordinatorMessage>
    ) -> Result<ActorRef<EmployeeProcessorMessage>, SpawnErr> {
        let (processor, _handle) = Actor::spawn(None, EmployeeProcessor, (employee_id, app_context, coordinator)).await?;

        Ok(processor)
    }

    /// Stop a processor once it has handled everything dispatched to it
    ///
    /// The coordinator is the only sender, so equal counts mean an empty mailbox.
    fn handle_processor_idle(&self, employee_id: EmployeeId, processed: u64, state: &mut CoordinatorState) {
        let drained = state.processors.get(&employee_id).is_some_and(|slot| slot.dispatched == processed);

        if drained && let Some(slot) = state.processors.remove(&employee_id) {
            slot.processor.stop(None);
            state.stats.processors_retired += 1;
            event!(Level::DEBUG, event = coordinator::PROCESSOR_RETIRED, employee_id = %employee_id,
                   processed = %processed);
        }
    }
}

/// Tell a waiting caller its request never reached a processor
fn fail_request(message: EmployeeProcessorMessage, error: WorkflowError) {
    let reply = match message {
        EmployeeProcessorMessage::Create { reply, .. } => reply,
        EmployeeProcessorMessage::ApplyTrigger { reply, .. } => reply
    };

    if let Some(reply) = reply
        && let Err(e) = reply.send(Err(error))
    {
        event!(Level::ERROR, event = coordinator::DISPATCH_FAILED, error = %e);
    }
}

/// Ask the coordinator to create `employee` and wait for the outcome
pub async fn create_employee(
    coordinator: &ActorRef<CoordinatorMessage>,
    employee: Employee,
    timeout: Duration
) -> Result<TransitionOutcome, WorkflowError> {
    request(coordinator, timeout, |reply| CoordinatorMessage::CreateEmployee { employee, reply: Some(reply) }).await
}

/// Ask the coordinator to apply `trigger` to an employee and wait for the outcome
pub async fn apply_trigger(
    coordinator: &ActorRef<CoordinatorMessage>,
    employee_id: EmployeeId,
    trigger: Trigger,
    timeout: Duration
) -> Result<TransitionOutcome, WorkflowError> {
    request(coordinator, timeout, |reply| CoordinatorMessage::ApplyTrigger { employee_id, trigger, reply: Some(reply) })
        .await
}

/// Current coordinator counters
pub async fn stats(
    coordinator: &ActorRef<CoordinatorMessage>,
    timeout: Duration
) -> Result<CoordinatorStats, WorkflowError> {
    match call(coordinator, |reply| CoordinatorMessage::GetStats { reply }, Some(timeout)).await {
        Ok(CallResult::Success(stats)) => Ok(stats),
        Ok(CallResult::Timeout) => Err(WorkflowError::Timeout("coordinator stats call timed out".to_string())),
        Ok(CallResult::SenderError) => Err(WorkflowError::Generic("coordinator dropped the stats reply".to_string())),
        Err(e) => Err(WorkflowError::Generic(format!("Failed to reach coordinator: {}", e)))
    }
}

async fn request<F>(
    coordinator: &ActorRef<CoordinatorMessage>,
    timeout: Duration,
    build: F
) -> Result<TransitionOutcome, WorkflowError>
where
    F: FnOnce(ractor::RpcReplyPort<Result<TransitionOutcome, WorkflowError>>) -> CoordinatorMessage
{
    match call(coordinator, build, Some(timeout)).await {
        Ok(CallResult::Success(result)) => result,
        Ok(CallResult::Timeout) => {
            Err(WorkflowError::Timeout(format!("no outcome within {} seconds", timeout.as_secs_f32())))
        }
        Ok(CallResult::SenderError) => Err(WorkflowError::Generic("processor dropped the reply".to_string())),
        Err(e) => Err(WorkflowError::Generic(format!("Failed to reach coordinator: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        adapter::{bus::InMemoryBus, storage::InMemoryEmployeeStorage},
        config::AppConfig,
        domain::{
            employee::{EmployeeDraft, EmployeeState},
            fsm::Decision
        }
    };

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn spawn_coordinator() -> (ActorRef<CoordinatorMessage>, Arc<AppContext>) {
        let context = AppContext::with_parts(
            AppConfig::default(),
            Arc::new(InMemoryEmployeeStorage::new()),
            Arc::new(InMemoryBus::default())
        )
        .await
        .unwrap();
        let context = Arc::new(context);

        let (coordinator, _handle) = Actor::spawn(None, Coordinator, context.clone()).await.unwrap();
        (coordinator, context)
    }

    async fn create(coordinator: &ActorRef<CoordinatorMessage>, context: &AppContext) -> Employee {
        let employee = Employee::new(context.ids.next_id(), EmployeeDraft::new("Jane Roe", "", 30));
        create_employee(coordinator, employee, TIMEOUT).await.unwrap().employee
    }

    #[tokio::test]
    async fn test_approval_walk() {
        let (coordinator, context) = spawn_coordinator().await;
        let employee = create(&coordinator, &context).await;
        assert_eq!(employee.id, 1);
        assert_eq!(employee.state, EmployeeState::Added);

        let steps = [
            (Trigger::Check, Decision::Accepted, EmployeeState::InCheck),
            (Trigger::Activate, Decision::Denied, EmployeeState::InCheck),
            (Trigger::Approve, Decision::Accepted, EmployeeState::Approved),
            (Trigger::Activate, Decision::Accepted, EmployeeState::Active)
        ];

        for (trigger, decision, state) in steps {
            let outcome = apply_trigger(&coordinator, employee.id, trigger, TIMEOUT).await.unwrap();
            assert_eq!(outcome.event, Some(trigger));
            assert_eq!(outcome.result, Some(decision));
            assert_eq!(outcome.employee.state, state);
        }

        coordinator.stop(None);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_never_both_win() {
        let (coordinator, context) = spawn_coordinator().await;

        for _ in 0..20 {
            let employee = create(&coordinator, &context).await;

            let (first, second) = tokio::join!(
                apply_trigger(&coordinator, employee.id, Trigger::Check, TIMEOUT),
                apply_trigger(&coordinator, employee.id, Trigger::Check, TIMEOUT)
            );
            let accepted = [first.unwrap(), second.unwrap()].iter().filter(|o| o.is_accepted()).count();
            assert_eq!(accepted, 1);

            let (approve, reject) = tokio::join!(
                apply_trigger(&coordinator, employee.id, Trigger::Approve, TIMEOUT),
                apply_trigger(&coordinator, employee.id, Trigger::Reject, TIMEOUT)
            );
            let approve = approve.unwrap();
            let reject = reject.unwrap();
            assert!(approve.is_accepted() ^ reject.is_accepted());

            let stored = context.storage.lookup(employee.id).await.unwrap().unwrap();
            let expected = if approve.is_accepted() { EmployeeState::Approved } else { EmployeeState::Added };
            assert_eq!(stored.state, expected);
        }

        coordinator.stop(None);
    }

    #[tokio::test]
    async fn test_unknown_employee_fails_without_side_effects() {
        let (coordinator, context) = spawn_coordinator().await;

        let result = apply_trigger(&coordinator, 99, Trigger::Check, TIMEOUT).await;
        assert_eq!(result, Err(WorkflowError::EmployeeNotFound(99)));
        assert!(context.storage.lookup(99).await.unwrap().is_none());

        coordinator.stop(None);
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_processors_retire() {
        let (coordinator, context) = spawn_coordinator().await;

        let mut ids = HashSet::new();
        for _ in 0..10 {
            assert!(ids.insert(create(&coordinator, &context).await.id));
        }

        // Idle reports are processed after the replies; give them a moment
        let mut current = stats(&coordinator, TIMEOUT).await.unwrap();
        for _ in 0..50 {
            if current.active_processors == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            current = stats(&coordinator, TIMEOUT).await.unwrap();
        }

        assert_eq!(current.active_processors, 0);
        assert_eq!(current.creations_routed, 10);
        assert_eq!(current.processors_spawned, current.processors_retired);

        coordinator.stop(None);
    }
}
