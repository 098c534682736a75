//! Employee intake service
//!
//! The caller-facing boundary: validates and publishes requests onto the
//! intake topics, and opens status subscriptions on the outcome topic.
//! Requests are acknowledged once they are on the bus; their effect arrives
//! later as outcomes.

use std::{sync::Arc, time::Duration};

use tracing::{Level, event};

use crate::{
    AppContext,
    domain::{
        constant::intake,
        employee::{Employee, EmployeeDraft, EmployeeId, IdAllocator},
        error::WorkflowError,
        event::{EmployeeAddEvent, EmployeeChangeStateEvent},
        fsm::Trigger
    },
    port::bus::MessageBus,
    service::{
        gateway::{StatusGateway, StatusSubscription},
        publisher::publish_with_timeout
    }
};

/// Submits employee requests and exposes their outcomes
pub struct EmployeeService {
    bus:             Arc<dyn MessageBus>,
    ids:             Arc<IdAllocator>,
    add_topic:       String,
    change_topic:    String,
    publish_timeout: Duration,
    gateway:         StatusGateway
}

impl EmployeeService {
    pub fn new(app_context: &AppContext) -> Self {
        let config = &app_context.config;

        Self {
            bus:             app_context.bus.clone(),
            ids:             app_context.ids.clone(),
            add_topic:       config.topics.add.clone(),
            change_topic:    config.topics.change_state.clone(),
            publish_timeout: config.publish_timeout(),
            gateway:         StatusGateway::new(app_context.bus.clone(), config.topics.status.clone(), config.status_start)
        }
    }

    /// Validate `draft`, give it a fresh id and queue its creation
    ///
    /// The returned employee is what will be stored; the creation outcome
    /// follows on the status topic once a processor has persisted it.
    pub async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee, WorkflowError> {
        draft.validate()?;

        let employee = Employee::new(self.ids.next_id(), draft);
        let request = EmployeeAddEvent { employee: employee.clone() };

        match publish_with_timeout(
            self.bus.as_ref(),
            &self.add_topic,
            Some(employee.id.to_string()),
            &request,
            self.publish_timeout
        )
        .await
        {
            Ok(offset) => {
                event!(Level::DEBUG, event = intake::EMPLOYEE_SUBMITTED, employee_id = %employee.id, offset = %offset);
                Ok(employee)
            }
            Err(e) => {
                event!(Level::ERROR, event = intake::SUBMIT_FAILED, employee_id = %employee.id,
                       topic = %self.add_topic, error = %e);
                Err(e)
            }
        }
    }

    /// Queue a trigger for `employee_id`
    ///
    /// The acknowledgment only says the request was accepted for processing.
    /// A trigger for an unknown id is acknowledged too and never yields an outcome.
    pub async fn submit_trigger(
        &self,
        employee_id: EmployeeId,
        trigger: Trigger
    ) -> Result<EmployeeChangeStateEvent, WorkflowError> {
        let request = EmployeeChangeStateEvent { employee_id, event: trigger };

        match publish_with_timeout(
            self.bus.as_ref(),
            &self.change_topic,
            Some(employee_id.to_string()),
            &request,
            self.publish_timeout
        )
        .await
        {
            Ok(offset) => {
                event!(Level::DEBUG, event = intake::TRIGGER_SUBMITTED, employee_id = %employee_id,
                       trigger = %trigger, offset = %offset);
                Ok(request)
            }
            Err(e) => {
                event!(Level::ERROR, event = intake::SUBMIT_FAILED, employee_id = %employee_id,
                       topic = %self.change_topic, error = %e);
                Err(e)
            }
        }
    }

    /// Live outcomes for one employee
    pub async fn subscribe_status(&self, employee_id: EmployeeId) -> Result<StatusSubscription, WorkflowError> {
        self.gateway.subscribe(employee_id).await
    }

    pub fn gateway(&self) -> &StatusGateway {
        &self.gateway
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use ractor::ActorRef;

    use super::*;
    use crate::{
        actor::{Guardian, GuardianMessage},
        adapter::{bus::InMemoryBus, storage::InMemoryEmployeeStorage},
        config::AppConfig,
        domain::{
            employee::EmployeeState,
            event::TransitionOutcome,
            fsm::Decision
        },
        port::{bus::StartPosition, storage::EmployeeStorage}
    };

    struct TestSystem {
        guardian: ActorRef<GuardianMessage>,
        service:  EmployeeService,
        storage:  Arc<InMemoryEmployeeStorage>
    }

    impl Drop for TestSystem {
        fn drop(&mut self) {
            self.guardian.stop(None);
        }
    }

    async fn start_system() -> TestSystem {
        let storage = Arc::new(InMemoryEmployeeStorage::new());
        let context = AppContext::with_parts(AppConfig::default(), storage.clone(), Arc::new(InMemoryBus::default()))
            .await
            .unwrap();
        let service = EmployeeService::new(&context);
        let guardian = Guardian::spawn_system(Arc::new(context)).await.unwrap();
        TestSystem { guardian, service, storage }
    }

    async fn next(subscription: &mut StatusSubscription) -> TransitionOutcome {
        tokio::time::timeout(Duration::from_secs(2), subscription.next()).await.unwrap().unwrap()
    }

    fn draft() -> EmployeeDraft {
        EmployeeDraft::new("Jane Roe", "Washington office", 30)
    }

    #[tokio::test]
    async fn test_approval_walk_through_the_bus() {
        let system = start_system().await;
        let service = &system.service;

        // Ids start at 1 on empty storage; subscribing first guarantees the creation outcome is seen
        let mut status = service.subscribe_status(1).await.unwrap();

        let employee = service.create_employee(draft()).await.unwrap();
        assert_eq!(employee.id, 1);
        assert_eq!(employee.state, EmployeeState::Added);

        let created = next(&mut status).await;
        assert!(created.is_creation());
        assert_eq!(created.result, None);

        let steps = [
            (Trigger::Check, Decision::Accepted, EmployeeState::InCheck),
            (Trigger::Activate, Decision::Denied, EmployeeState::InCheck),
            (Trigger::Approve, Decision::Accepted, EmployeeState::Approved),
            (Trigger::Activate, Decision::Accepted, EmployeeState::Active)
        ];

        for (trigger, _, _) in steps {
            let ack = service.submit_trigger(employee.id, trigger).await.unwrap();
            assert_eq!(ack, EmployeeChangeStateEvent { employee_id: employee.id, event: trigger });
        }

        for (trigger, decision, state) in steps {
            let outcome = next(&mut status).await;
            assert_eq!(outcome.event, Some(trigger));
            assert_eq!(outcome.result, Some(decision));
            assert_eq!(outcome.employee.state, state);
        }

        assert_eq!(system.storage.lookup(employee.id).await.unwrap().unwrap().state, EmployeeState::Active);
    }

    #[tokio::test]
    async fn test_late_subscription_sees_only_new_outcomes() {
        let system = start_system().await;
        let service = &system.service;

        let mut watcher = service.subscribe_status(1).await.unwrap();
        let employee = service.create_employee(draft()).await.unwrap();
        next(&mut watcher).await;
        service.submit_trigger(employee.id, Trigger::Check).await.unwrap();
        next(&mut watcher).await;

        let mut late = service.subscribe_status(employee.id).await.unwrap();
        let mut replay = service.gateway().subscribe_from(employee.id, StartPosition::Earliest).await.unwrap();

        service.submit_trigger(employee.id, Trigger::Reject).await.unwrap();

        let outcome = next(&mut late).await;
        assert_eq!(outcome.event, Some(Trigger::Reject));
        assert_eq!(outcome.employee.state, EmployeeState::Added);

        assert!(next(&mut replay).await.is_creation());
        assert_eq!(next(&mut replay).await.event, Some(Trigger::Check));
        assert_eq!(next(&mut replay).await.event, Some(Trigger::Reject));
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let system = start_system().await;

        let mut last = 0;
        for _ in 0..5 {
            let employee = system.service.create_employee(draft()).await.unwrap();
            assert!(employee.id > last);
            last = employee.id;
        }
    }

    #[tokio::test]
    async fn test_invalid_draft_is_rejected_before_publishing() {
        let system = start_system().await;

        let result = system.service.create_employee(EmployeeDraft::new("Kid", "", 16)).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        // The rejected draft consumed no id
        assert_eq!(system.service.create_employee(draft()).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_unknown_employee_never_yields_an_outcome() {
        let system = start_system().await;
        let service = &system.service;

        let mut status = service.subscribe_status(404).await.unwrap();
        service.submit_trigger(404, Trigger::Check).await.unwrap();

        // A later request for a real employee proves the unknown one was already handled
        let employee = service.create_employee(draft()).await.unwrap();
        let mut real = service.subscribe_status(employee.id).await.unwrap();
        service.submit_trigger(employee.id, Trigger::Check).await.unwrap();
        while next(&mut real).await.is_creation() {}

        let nothing = tokio::time::timeout(Duration::from_millis(100), status.next()).await;
        assert!(nothing.is_err());
        assert!(system.storage.lookup(404).await.unwrap().is_none());
    }
}
