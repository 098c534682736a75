//! Outcome publishing
//!
//! Publishing is a notification, not part of the storage transaction: once an
//! employee has been persisted, a failed or slow publish is logged and the
//! mutation stands.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::{Level, event};

use crate::{
    domain::{constant::publisher, error::WorkflowError, event::TransitionOutcome},
    port::bus::MessageBus
};

/// Publish `payload` to `topic`, giving up after `timeout`
pub async fn publish_with_timeout<T: Serialize>(
    bus: &dyn MessageBus,
    topic: &str,
    key: Option<String>,
    payload: &T,
    timeout: Duration
) -> Result<u64, WorkflowError> {
    let payload = serde_json::to_value(payload)?;

    match tokio::time::timeout(timeout, bus.publish(topic, key, payload)).await {
        Ok(result) => result,
        Err(_) => Err(WorkflowError::PublishTimeout(format!(
            "publishing to {} did not complete within {}ms",
            topic,
            timeout.as_millis()
        )))
    }
}

/// Sends transition outcomes to the status topic
pub struct OutcomePublisher {
    bus:     Arc<dyn MessageBus>,
    topic:   String,
    timeout: Duration
}

impl OutcomePublisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic: String, timeout: Duration) -> Self {
        Self { bus, topic, timeout }
    }

    /// Publish one outcome keyed by employee id, bounded by the configured timeout
    pub async fn publish(&self, outcome: &TransitionOutcome) -> Result<u64, WorkflowError> {
        event!(Level::DEBUG, event = publisher::OUTCOME_PUBLISHING,
               employee_id = %outcome.employee_id(), outcome_id = %outcome.outcome_id);

        let offset = publish_with_timeout(
            self.bus.as_ref(),
            &self.topic,
            Some(outcome.employee_id().to_string()),
            outcome,
            self.timeout
        )
        .await?;

        event!(Level::DEBUG, event = publisher::OUTCOME_PUBLISHED,
               employee_id = %outcome.employee_id(), topic = %self.topic, offset = %offset);
        Ok(offset)
    }

    /// Publish and log any failure; never fails the caller
    pub async fn notify(&self, outcome: &TransitionOutcome) -> Option<u64> {
        match self.publish(outcome).await {
            Ok(offset) => Some(offset),
            Err(e) => {
                event!(Level::ERROR, event = publisher::OUTCOME_PUBLISH_FAILED,
                       employee_id = %outcome.employee_id(), outcome_id = %outcome.outcome_id,
                       topic = %self.topic, error = %e);
                None
            }
        }
    }
}
