//! Typed messages for actor communication

use ractor::{ActorRef, Message, RpcReplyPort};

use crate::domain::{
    employee::{Employee, EmployeeId},
    error::WorkflowError,
    event::TransitionOutcome,
    fsm::Trigger
};

/// Reply port for requests whose caller wants the outcome back
///
/// `None` for requests consumed from the bus: nobody waits on those, so
/// failures are logged by the processor instead.
pub type OutcomeReply = Option<RpcReplyPort<Result<TransitionOutcome, WorkflowError>>>;

/// Messages for the Guardian actor (root of actor system)
#[derive(Debug)]
pub enum GuardianMessage {
    /// Spawn the coordinator and start the intake listeners
    Initialize { reply: RpcReplyPort<Result<(), WorkflowError>> },
    /// Reference to the coordinator, once initialized
    GetCoordinator { reply: RpcReplyPort<Option<ActorRef<CoordinatorMessage>>> },
    /// Shutdown the entire system
    Shutdown,
    /// System health check
    HealthCheck { reply: RpcReplyPort<SystemHealth> }
}

/// Messages for the Coordinator actor
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Persist a freshly allocated employee and announce it
    CreateEmployee { employee: Employee, reply: OutcomeReply },
    /// Evaluate a trigger against an employee's stored state
    ApplyTrigger { employee_id: EmployeeId, trigger: Trigger, reply: OutcomeReply },
    /// A processor finished `processed` requests in total
    ProcessorIdle { employee_id: EmployeeId, processed: u64 },
    /// Statistics for health checks
    GetStats { reply: RpcReplyPort<CoordinatorStats> }
}

/// Messages for EmployeeProcessor actors (one per employee id)
#[derive(Debug)]
pub enum EmployeeProcessorMessage {
    Create { employee: Employee, reply: OutcomeReply },
    ApplyTrigger { trigger: Trigger, reply: OutcomeReply }
}

/// Coordinator counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub active_processors:  usize,
    pub creations_routed:   u64,
    pub triggers_routed:    u64,
    pub processors_spawned: u64,
    pub processors_retired: u64
}

/// System health information
#[derive(Debug)]
pub struct SystemHealth {
    pub is_initialized:    bool,
    pub active_processors: usize,
    pub requests_routed:   u64,
    pub uptime_seconds:    u64
}

// Implement Message trait for Ractor
impl Message for GuardianMessage {}
impl Message for CoordinatorMessage {}
impl Message for EmployeeProcessorMessage {}
