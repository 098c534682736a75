//! Domain Events - Structured events for internal monitoring and debugging

/// Default bus topic names
pub mod topic {
    pub const EMPLOYEE_ADD: &str = "employee-add";
    pub const EMPLOYEE_CHANGE_STATE: &str = "employee-change-state";
    pub const EMPLOYEE_STATUS: &str = "employee-status";
}

/// Guardian Actor Events
pub mod guardian {
    pub const GUARDIAN_STARTED: &str = "guardian.started";
    pub const CHILDREN_SPAWNING: &str = "children.spawning";
    pub const CHILDREN_SPAWNED: &str = "children.spawned";
    pub const CHILDREN_SPAWN_FAILED: &str = "children.spawn_failed";
    pub const SYSTEM_INITIALIZED: &str = "system.initialized";
    pub const SYSTEM_SHUTDOWN_STARTED: &str = "system.shutdown_started";
    pub const SYSTEM_SHUTDOWN_COMPLETED: &str = "system.shutdown_completed";
    pub const CHILD_STOPPED: &str = "child.stopped";
    pub const HEALTH_CHECK_COMPLETED: &str = "health.check_completed";
}

/// Coordinator Actor Events
pub mod coordinator {
    pub const COORDINATOR_STARTED: &str = "coordinator.started";
    pub const COORDINATOR_STOPPED: &str = "coordinator.stopped";
    pub const CREATE_DISPATCHED: &str = "create.dispatched";
    pub const TRIGGER_DISPATCHED: &str = "trigger.dispatched";
    pub const DISPATCH_FAILED: &str = "dispatch.failed";
    pub const PROCESSOR_SPAWNED: &str = "processor.spawned";
    pub const PROCESSOR_SPAWN_FAILED: &str = "processor.spawn_failed";
    pub const PROCESSOR_RETIRED: &str = "processor.retired";
}

/// EmployeeProcessor Actor Events
pub mod processor {
    pub const PROCESSOR_STARTED: &str = "processor.started";
    pub const EMPLOYEE_CREATED: &str = "employee.created";
    pub const TRIGGER_RECEIVED: &str = "trigger.received";
    pub const TRIGGER_EVALUATED: &str = "trigger.evaluated";
    pub const REQUEST_DROPPED: &str = "request.dropped";
    pub const REQUEST_FAILED: &str = "request.failed";
    pub const REPLY_FAILED: &str = "reply.failed";
}

/// Outcome Publisher Events
pub mod publisher {
    pub const OUTCOME_PUBLISHING: &str = "outcome.publishing";
    pub const OUTCOME_PUBLISHED: &str = "outcome.published";
    pub const OUTCOME_PUBLISH_FAILED: &str = "outcome.publish_failed";
}

/// Status Gateway Events
pub mod gateway {
    pub const SUBSCRIPTION_OPENED: &str = "subscription.opened";
    pub const SUBSCRIPTION_CLOSED: &str = "subscription.closed";
    pub const OUTCOME_DELIVERED: &str = "outcome.delivered";
    pub const RECORD_SKIPPED: &str = "record.skipped";
    pub const CONSUMER_LAGGED: &str = "consumer.lagged";
}

/// Intake Events
pub mod intake {
    pub const EMPLOYEE_SUBMITTED: &str = "employee.submitted";
    pub const TRIGGER_SUBMITTED: &str = "trigger.submitted";
    pub const SUBMIT_FAILED: &str = "submit.failed";
    pub const LISTENER_STARTED: &str = "listener.started";
    pub const LISTENER_STOPPED: &str = "listener.stopped";
    pub const RECORD_RECEIVED: &str = "record.received";
    pub const RECORD_REJECTED: &str = "record.rejected";
}

/// Storage Events
pub mod storage {
    pub const STORAGE_OPENED: &str = "storage.opened";
    pub const EMPLOYEE_UPSERTED: &str = "employee.upserted";
}
