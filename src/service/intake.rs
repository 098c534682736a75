//! Intake listeners
//!
//! Two background tasks turn records on the add and change-state topics into
//! coordinator requests. Nobody waits on these requests, so they carry no
//! reply port and the processor logs their failures.

use std::sync::Arc;

use futures::StreamExt;
use ractor::ActorRef;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

use crate::{
    actor::message::CoordinatorMessage,
    config::TopicConfig,
    domain::{
        constant::intake,
        error::WorkflowError,
        event::{EmployeeAddEvent, EmployeeChangeStateEvent}
    },
    port::bus::{BusRecord, MessageBus, RecordStream, StartPosition}
};

/// Handle on the running intake tasks
pub struct IntakeListener {
    cancel: CancellationToken,
    tasks:  Vec<JoinHandle<()>>
}

impl IntakeListener {
    /// Subscribe to both intake topics and start forwarding to `coordinator`
    ///
    /// Subscriptions are open when this returns, so anything published
    /// afterwards is picked up.
    pub async fn start(
        bus: Arc<dyn MessageBus>,
        topics: &TopicConfig,
        start: StartPosition,
        coordinator: ActorRef<CoordinatorMessage>,
        cancel: CancellationToken
    ) -> Result<Self, WorkflowError> {
        let adds = bus.subscribe(&topics.add, start).await?;
        let changes = bus.subscribe(&topics.change_state, start).await?;

        let tasks = vec![
            tokio::spawn(consume(topics.add.clone(), adds, coordinator.clone(), cancel.clone(), route_add)),
            tokio::spawn(consume(topics.change_state.clone(), changes, coordinator, cancel.clone(), route_change))
        ];

        Ok(Self { cancel, tasks })
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Stop both tasks and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                event!(Level::ERROR, event = intake::LISTENER_STOPPED, error = %e);
            }
        }
    }
}

fn route_add(record: &BusRecord) -> Result<CoordinatorMessage, WorkflowError> {
    let EmployeeAddEvent { employee } = record.decode()?;
    Ok(CoordinatorMessage::CreateEmployee { employee, reply: None })
}

fn route_change(record: &BusRecord) -> Result<CoordinatorMessage, WorkflowError> {
    let EmployeeChangeStateEvent { employee_id, event } = record.decode()?;
    Ok(CoordinatorMessage::ApplyTrigger { employee_id, trigger: event, reply: None })
}

async fn consume(
    topic: String,
    mut records: RecordStream,
    coordinator: ActorRef<CoordinatorMessage>,
    cancel: CancellationToken,
    route: fn(&BusRecord) -> Result<CoordinatorMessage, WorkflowError>
) {
    event!(Level::DEBUG, event = intake::LISTENER_STARTED, topic = %topic);

    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            next = records.next() => match next {
                Some(record) => record,
                None => break
            }
        };

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                event!(Level::WARN, event = intake::RECORD_REJECTED, topic = %topic, error = %e);
                continue;
            }
        };

        event!(Level::DEBUG, event = intake::RECORD_RECEIVED, topic = %topic, offset = %record.offset);

        match route(&record) {
            Ok(message) => {
                if let Err(e) = coordinator.cast(message) {
                    event!(Level::ERROR, event = intake::SUBMIT_FAILED, topic = %topic, error = %e);
                    break;
                }
            }
            Err(e) => {
                event!(Level::WARN, event = intake::RECORD_REJECTED, topic = %topic, offset = %record.offset,
                       error = %e);
            }
        }
    }

    event!(Level::DEBUG, event = intake::LISTENER_STOPPED, topic = %topic);
}
