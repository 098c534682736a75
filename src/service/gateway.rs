//! Status subscription gateway
//!
//! Turns the shared outcome topic into per-caller streams. Filtering happens
//! on the consumer side: every subscription reads the whole topic and keeps
//! what its predicate accepts.

use std::{
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering}
    },
    task::{Context, Poll}
};

use futures::{Stream, StreamExt, future};
use tracing::{Level, event};

use crate::{
    domain::{constant::gateway, employee::EmployeeId, error::WorkflowError, event::TransitionOutcome},
    port::bus::{MessageBus, StartPosition}
};

/// Live stream of outcomes for one subscriber
///
/// Never ends on its own. Dropping it closes the underlying consumer.
pub struct StatusSubscription {
    consumer_id: String,
    inner:       Pin<Box<dyn Stream<Item = TransitionOutcome> + Send>>
}

impl StatusSubscription {
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }
}

impl Stream for StatusSubscription {
    type Item = TransitionOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        event!(Level::DEBUG, event = gateway::SUBSCRIPTION_CLOSED, consumer_id = %self.consumer_id);
    }
}

/// Opens filtered subscriptions on the outcome topic
pub struct StatusGateway {
    bus:           Arc<dyn MessageBus>,
    topic:         String,
    default_start: StartPosition,
    consumers:     AtomicU64
}

impl StatusGateway {
    pub fn new(bus: Arc<dyn MessageBus>, topic: String, default_start: StartPosition) -> Self {
        Self { bus, topic, default_start, consumers: AtomicU64::new(0) }
    }

    /// Outcomes for `employee_id` from the configured start position on
    pub async fn subscribe(&self, employee_id: EmployeeId) -> Result<StatusSubscription, WorkflowError> {
        self.subscribe_from(employee_id, self.default_start).await
    }

    /// Outcomes for `employee_id` from an explicit start position
    pub async fn subscribe_from(
        &self,
        employee_id: EmployeeId,
        start: StartPosition
    ) -> Result<StatusSubscription, WorkflowError> {
        self.subscribe_filtered(start, move |outcome| outcome.employee_id() == employee_id).await
    }

    /// Every outcome, regardless of employee
    pub async fn subscribe_all(&self, start: StartPosition) -> Result<StatusSubscription, WorkflowError> {
        self.subscribe_filtered(start, |_| true).await
    }

    /// Outcomes accepted by `predicate`
    ///
    /// Records that do not decode, and gaps reported by a lagging consumer,
    /// are logged and skipped rather than ending the stream.
    pub async fn subscribe_filtered<F>(
        &self,
        start: StartPosition,
        predicate: F
    ) -> Result<StatusSubscription, WorkflowError>
    where
        F: Fn(&TransitionOutcome) -> bool + Send + Sync + 'static
    {
        let consumer_id = format!("{}-{}", self.topic, self.consumers.fetch_add(1, Ordering::Relaxed) + 1);
        let records = self.bus.subscribe(&self.topic, start).await?;

        event!(Level::DEBUG, event = gateway::SUBSCRIPTION_OPENED,
               consumer_id = %consumer_id, topic = %self.topic, start = ?start);

        let log_id = consumer_id.clone();
        let outcomes = records.filter_map(move |record| {
            let outcome = match record {
                Ok(record) => match record.decode::<TransitionOutcome>() {
                    Ok(outcome) if predicate(&outcome) => {
                        event!(Level::DEBUG, event = gateway::OUTCOME_DELIVERED,
                               consumer_id = %log_id, employee_id = %outcome.employee_id(), offset = %record.offset);
                        Some(outcome)
                    }
                    Ok(_) => None,
                    Err(e) => {
                        event!(Level::WARN, event = gateway::RECORD_SKIPPED, consumer_id = %log_id, error = %e);
                        None
                    }
                },
                Err(e) => {
                    event!(Level::WARN, event = gateway::CONSUMER_LAGGED, consumer_id = %log_id, error = %e);
                    None
                }
            };
            future::ready(outcome)
        });

        Ok(StatusSubscription { consumer_id, inner: Box::pin(outcomes) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{
        adapter::bus::InMemoryBus,
        domain::{
            employee::{Employee, EmployeeDraft},
            fsm::{Decision, Trigger}
        },
        service::publisher::OutcomePublisher
    };

    fn outcome_for(id: EmployeeId) -> TransitionOutcome {
        TransitionOutcome::attempted(
            Trigger::Check,
            Decision::Denied,
            Employee::new(id, EmployeeDraft::new("Jane Roe", "", 25))
        )
    }

    async fn next(subscription: &mut StatusSubscription) -> TransitionOutcome {
        tokio::time::timeout(Duration::from_secs(1), subscription.next()).await.unwrap().unwrap()
    }

    fn setup() -> (Arc<InMemoryBus>, OutcomePublisher, StatusGateway) {
        let bus = Arc::new(InMemoryBus::default());
        let publisher = OutcomePublisher::new(bus.clone(), "status".to_string(), Duration::from_secs(1));
        let gateway = StatusGateway::new(bus.clone(), "status".to_string(), StartPosition::Latest);
        (bus, publisher, gateway)
    }

    #[tokio::test]
    async fn test_subscription_only_sees_its_employee() {
        let (_bus, publisher, gateway) = setup();
        let mut first = gateway.subscribe(1).await.unwrap();
        let mut second = gateway.subscribe(2).await.unwrap();

        for id in [2, 1, 3, 1] {
            publisher.publish(&outcome_for(id)).await.unwrap();
        }

        assert_eq!(next(&mut first).await.employee_id(), 1);
        assert_eq!(next(&mut first).await.employee_id(), 1);
        assert_eq!(next(&mut second).await.employee_id(), 2);
        assert_ne!(first.consumer_id(), second.consumer_id());
    }

    #[tokio::test]
    async fn test_history_needs_explicit_start() {
        let (_bus, publisher, gateway) = setup();
        let old = outcome_for(1);
        publisher.publish(&old).await.unwrap();

        let mut live = gateway.subscribe(1).await.unwrap();
        let mut replay = gateway.subscribe_from(1, StartPosition::Earliest).await.unwrap();

        let new = outcome_for(1);
        publisher.publish(&new).await.unwrap();

        assert_eq!(next(&mut live).await, new);
        assert_eq!(next(&mut replay).await, old);
        assert_eq!(next(&mut replay).await, new);
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped() {
        let (bus, publisher, gateway) = setup();
        let mut all = gateway.subscribe_all(StartPosition::Latest).await.unwrap();

        bus.publish("status", None, json!({"not": "an outcome"})).await.unwrap();
        publisher.publish(&outcome_for(9)).await.unwrap();

        assert_eq!(next(&mut all).await.employee_id(), 9);
    }

    #[tokio::test]
    async fn test_drop_releases_consumer() {
        let (bus, _publisher, gateway) = setup();

        let subscription = gateway.subscribe(1).await.unwrap();
        assert_eq!(bus.consumer_count("status").await, 1);

        drop(subscription);
        assert_eq!(bus.consumer_count("status").await, 0);
    }
}
