//! Guardian Actor - Root Supervisor
//!
//! The Guardian is the root of the actor hierarchy and manages system-wide concerns:
//! - Spawns the Coordinator and the intake listeners
//! - Handles system initialization and shutdown
//! - Provides health checks

use std::{sync::Arc, time::SystemTime};

use ractor::{
    Actor, ActorProcessingErr, ActorRef, RpcReplyPort,
    rpc::{CallResult, call}
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    AppContext,
    actor::{
        coordinator::{self, Coordinator},
        message::{CoordinatorMessage, GuardianMessage, SystemHealth}
    },
    domain::{constant::guardian, error::WorkflowError},
    port::bus::StartPosition,
    service::intake::IntakeListener
};

/// Guardian Actor State - tracks child actors and system metrics
pub struct GuardianState {
    app_context:    Arc<AppContext>,
    /// Coordinator actor reference
    coordinator:    Option<ActorRef<CoordinatorMessage>>,
    /// Background tasks feeding the coordinator from the bus
    intake:         Option<IntakeListener>,
    /// System startup time for uptime calculation
    startup_time:   SystemTime,
    /// System initialization flag
    is_initialized: bool
}

/// Guardian Actor - Root supervisor of the actor system
pub struct Guardian;

#[async_trait::async_trait]
impl Actor for Guardian {
    type Arguments = Arc<AppContext>;
    type Msg = GuardianMessage;
    type State = GuardianState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        app_context: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = guardian::GUARDIAN_STARTED);

        Ok(GuardianState {
            app_context,
            coordinator: None,
            intake: None,
            startup_time: SystemTime::now(),
            is_initialized: false
        })
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        self.stop_children(state).await;
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            GuardianMessage::Initialize { reply } => {
                let result = self.handle_initialize(state).await;
                if let Err(e) = reply.send(result) {
                    event!(Level::ERROR, event = guardian::SYSTEM_INITIALIZED, error = %e);
                }
            }
            GuardianMessage::GetCoordinator { reply } => {
                if let Err(e) = reply.send(state.coordinator.clone()) {
                    event!(Level::ERROR, event = guardian::CHILDREN_SPAWNED, error = %e);
                }
            }
            GuardianMessage::Shutdown => self.handle_shutdown(state).await,
            GuardianMessage::HealthCheck { reply } => self.handle_health_check(reply, state).await
        }

        Ok(())
    }
}

impl Guardian {
    /// Spawn the complete actor system and wait until it consumes the intake topics
    pub async fn spawn_system(app_context: Arc<AppContext>) -> Result<ActorRef<GuardianMessage>, WorkflowError> {
        let timeout = app_context.config.call_timeout();
        let name = format!("guardian-{}", Uuid::new_v4());
        let (guardian_ref, _handle) = Actor::spawn(Some(name), Guardian, app_context).await?;

        let initialized = match call(&guardian_ref, |reply| GuardianMessage::Initialize { reply }, Some(timeout)).await {
            Ok(CallResult::Success(result)) => result,
            Ok(CallResult::Timeout) => Err(WorkflowError::Timeout("guardian initialization timed out".to_string())),
            Ok(CallResult::SenderError) => {
                Err(WorkflowError::Generic("guardian dropped the initialization reply".to_string()))
            }
            Err(e) => Err(WorkflowError::Generic(format!("Failed to initialize guardian: {}", e)))
        };

        if let Err(e) = initialized {
            event!(Level::ERROR, event = guardian::CHILDREN_SPAWN_FAILED, error = %e);
            guardian_ref.stop(None);
            return Err(e);
        }

        Ok(guardian_ref)
    }

    /// Coordinator of a running system
    pub async fn coordinator(guardian: &ActorRef<GuardianMessage>) -> Result<ActorRef<CoordinatorMessage>, WorkflowError> {
        match call(guardian, |reply| GuardianMessage::GetCoordinator { reply }, None).await {
            Ok(CallResult::Success(Some(coordinator))) => Ok(coordinator),
            Ok(CallResult::Success(None)) => Err(WorkflowError::Generic("actor system is not initialized".to_string())),
            Ok(_) => Err(WorkflowError::Generic("guardian did not answer".to_string())),
            Err(e) => Err(WorkflowError::Generic(format!("Failed to reach guardian: {}", e)))
        }
    }

    /// Current system health
    pub async fn health(guardian: &ActorRef<GuardianMessage>) -> Result<SystemHealth, WorkflowError> {
        match call(guardian, |reply| GuardianMessage::HealthCheck { reply }, None).await {
            Ok(CallResult::Success(health)) => Ok(health),
            Ok(_) => Err(WorkflowError::Generic("guardian did not answer".to_string())),
            Err(e) => Err(WorkflowError::Generic(format!("Failed to reach guardian: {}", e)))
        }
    }

    /// Spawn the coordinator, then open the intake subscriptions
    async fn handle_initialize(&self, state: &mut GuardianState) -> Result<(), WorkflowError> {
        if state.is_initialized {
            return Ok(());
        }

        event!(Level::DEBUG, event = guardian::CHILDREN_SPAWNING);

        let coordinator = match Actor::spawn(None, Coordinator, state.app_context.clone()).await {
            Ok((coordinator_ref, _handle)) => {
                event!(Level::DEBUG, event = guardian::CHILDREN_SPAWNED, actor = "coordinator");
                coordinator_ref
            }
            Err(e) => {
                event!(Level::ERROR, event = guardian::CHILDREN_SPAWN_FAILED, actor = "coordinator", error = %e);
                return Err(WorkflowError::from(e));
            }
        };

        let config = &state.app_context.config;
        let intake = IntakeListener::start(
            state.app_context.bus.clone(),
            &config.topics,
            StartPosition::Latest,
            coordinator.clone(),
            CancellationToken::new()
        )
        .await;

        match intake {
            Ok(intake) => {
                event!(Level::DEBUG, event = guardian::CHILDREN_SPAWNED, actor = "intake_listener");
                state.intake = Some(intake);
            }
            Err(e) => {
                event!(Level::ERROR, event = guardian::CHILDREN_SPAWN_FAILED, actor = "intake_listener", error = %e);
                coordinator.stop(None);
                return Err(e);
            }
        }

        state.coordinator = Some(coordinator);
        state.is_initialized = true;
        event!(Level::INFO, event = guardian::SYSTEM_INITIALIZED,
               storage = %config.storage_type.as_str(), last_id = %state.app_context.ids.last_id());
        Ok(())
    }

    /// Shutdown child actors gracefully
    async fn handle_shutdown(&self, state: &mut GuardianState) {
        event!(Level::DEBUG, event = guardian::SYSTEM_SHUTDOWN_STARTED);
        self.stop_children(state).await;
        event!(Level::INFO, event = guardian::SYSTEM_SHUTDOWN_COMPLETED);
    }

    async fn stop_children(&self, state: &mut GuardianState) {
        // Stop intake first so nothing new reaches a stopping coordinator
        if let Some(intake) = state.intake.take() {
            intake.shutdown().await;
            event!(Level::DEBUG, event = guardian::CHILD_STOPPED, actor = "intake_listener");
        }

        if let Some(coordinator) = state.coordinator.take() {
            coordinator.stop(None);
            event!(Level::DEBUG, event = guardian::CHILD_STOPPED, actor = "coordinator");
        }

        state.is_initialized = false;
    }

    /// Handle health check requests
    async fn handle_health_check(&self, reply: RpcReplyPort<SystemHealth>, state: &GuardianState) {
        let uptime_seconds = state.startup_time.elapsed().unwrap_or_default().as_secs();

        let stats = match &state.coordinator {
            Some(coordinator) => {
                coordinator::stats(coordinator, state.app_context.config.call_timeout()).await.unwrap_or_default()
            }
            None => Default::default()
        };

        let health = SystemHealth {
            is_initialized: state.is_initialized,
            active_processors: stats.active_processors,
            requests_routed: stats.creations_routed + stats.triggers_routed,
            uptime_seconds
        };

        event!(Level::DEBUG, event = guardian::HEALTH_CHECK_COMPLETED,
               active_processors = %health.active_processors, uptime_seconds = %uptime_seconds);

        if let Err(e) = reply.send(health) {
            event!(Level::ERROR, event = guardian::HEALTH_CHECK_COMPLETED, error = %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        adapter::{bus::InMemoryBus, storage::InMemoryEmployeeStorage},
        config::AppConfig,
        domain::{
            employee::{Employee, EmployeeDraft},
            fsm::Trigger
        }
    };

    async fn create_test_context() -> Arc<AppContext> {
        let context = AppContext::with_parts(
            AppConfig::default(),
            Arc::new(InMemoryEmployeeStorage::new()),
            Arc::new(InMemoryBus::default())
        )
        .await
        .unwrap();
        Arc::new(context)
    }

    #[tokio::test]
    async fn test_spawn_system_initializes_children() {
        let context = create_test_context().await;
        let guardian = Guardian::spawn_system(context.clone()).await.unwrap();

        let health = Guardian::health(&guardian).await.unwrap();
        assert!(health.is_initialized);
        assert_eq!(health.requests_routed, 0);

        let coordinator = Guardian::coordinator(&guardian).await.unwrap();
        let employee = Employee::new(context.ids.next_id(), EmployeeDraft::new("Jane Roe", "", 30));
        coordinator::create_employee(&coordinator, employee, Duration::from_secs(5)).await.unwrap();
        coordinator::apply_trigger(&coordinator, 1, Trigger::Check, Duration::from_secs(5)).await.unwrap();

        let health = Guardian::health(&guardian).await.unwrap();
        assert_eq!(health.requests_routed, 2);

        guardian.stop(None);
    }

    #[tokio::test]
    async fn test_shutdown_stops_intake_and_coordinator() {
        let bus = Arc::new(InMemoryBus::default());
        let context = AppContext::with_parts(AppConfig::default(), Arc::new(InMemoryEmployeeStorage::new()), bus.clone())
            .await
            .unwrap();
        let topics = context.config.topics.clone();
        let guardian = Guardian::spawn_system(Arc::new(context)).await.unwrap();
        assert_eq!(bus.consumer_count(&topics.add).await, 1);
        assert_eq!(bus.consumer_count(&topics.change_state).await, 1);

        guardian.cast(GuardianMessage::Shutdown).unwrap();

        let health = Guardian::health(&guardian).await.unwrap();
        assert!(!health.is_initialized);
        assert_eq!(health.active_processors, 0);
        assert!(Guardian::coordinator(&guardian).await.is_err());
        assert_eq!(bus.consumer_count(&topics.add).await, 0);
        assert_eq!(bus.consumer_count(&topics.change_state).await, 0);

        guardian.stop(None);
    }
}
