//! In-process message bus
//!
//! Each topic keeps a bounded log of recent records plus a broadcast channel
//! for live delivery. A subscription replays the requested part of the log and
//! then follows the channel. Both happen under the topic lock, so a record is
//! either in the replayed backlog or delivered live, never both and never neither.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, stream};
use tokio::sync::{Mutex, broadcast};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use crate::{
    config::BusConfig,
    domain::error::WorkflowError,
    port::bus::{BusRecord, MessageBus, RecordStream, StartPosition}
};

struct Topic {
    log:         VecDeque<BusRecord>,
    next_offset: u64,
    sender:      broadcast::Sender<BusRecord>
}

impl Topic {
    fn new(capacity: usize) -> Self {
        Self { log: VecDeque::new(), next_offset: 0, sender: broadcast::channel(capacity).0 }
    }

    fn backlog(&self, start: StartPosition) -> Vec<BusRecord> {
        match start {
            StartPosition::Latest => Vec::new(),
            StartPosition::Earliest => self.log.iter().cloned().collect(),
            StartPosition::Offset(from) => self.log.iter().filter(|record| record.offset >= from).cloned().collect()
        }
    }
}

/// Bus keeping everything in process memory
pub struct InMemoryBus {
    topics:    Mutex<HashMap<String, Topic>>,
    capacity:  usize,
    retention: usize
}

impl InMemoryBus {
    pub fn new(config: &BusConfig) -> Self {
        Self { topics: Mutex::new(HashMap::new()), capacity: config.capacity.max(1), retention: config.retention }
    }

    /// Number of live consumers attached to `topic`
    pub async fn consumer_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().await;
        topics.get(topic).map(|t| t.sender.receiver_count()).unwrap_or(0)
    }

    /// Offset the next record on `topic` will get
    pub async fn end_offset(&self, topic: &str) -> u64 {
        let topics = self.topics.lock().await;
        topics.get(topic).map(|t| t.next_offset).unwrap_or(0)
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new(&BusConfig::default())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(
        &self,
        topic: &str,
        key: Option<String>,
        payload: serde_json::Value
    ) -> Result<u64, WorkflowError> {
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(|| Topic::new(self.capacity));

        let record = BusRecord {
            topic: topic.to_string(),
            offset: entry.next_offset,
            key,
            payload,
            timestamp: Utc::now()
        };
        entry.next_offset += 1;

        entry.log.push_back(record.clone());
        while entry.log.len() > self.retention {
            entry.log.pop_front();
        }

        // No consumers is not an error: the record stays in the log
        let _ = entry.sender.send(record.clone());

        Ok(record.offset)
    }

    async fn subscribe(&self, topic: &str, start: StartPosition) -> Result<RecordStream, WorkflowError> {
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_insert_with(|| Topic::new(self.capacity));

        let receiver = entry.sender.subscribe();
        let backlog = entry.backlog(start);
        let topic_name = topic.to_string();

        let live = BroadcastStream::new(receiver).map(move |item| match item {
            Ok(record) => Ok(record),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                Err(WorkflowError::Bus(format!("consumer on {} lagged, {} records skipped", topic_name, skipped)))
            }
        });

        Ok(Box::pin(stream::iter(backlog.into_iter().map(Ok)).chain(live)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    async fn next_offset(stream: &mut RecordStream) -> u64 {
        tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap().unwrap().offset
    }

    #[tokio::test]
    async fn test_latest_skips_history() {
        let bus = InMemoryBus::default();
        bus.publish("t", None, json!({"n": 0})).await.unwrap();

        let mut stream = bus.subscribe("t", StartPosition::Latest).await.unwrap();
        bus.publish("t", Some("k".to_string()), json!({"n": 1})).await.unwrap();

        let record = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap().unwrap();
        assert_eq!(record.offset, 1);
        assert_eq!(record.key.as_deref(), Some("k"));
        assert_eq!(record.payload["n"], 1);
    }

    #[tokio::test]
    async fn test_earliest_replays_then_follows() {
        let bus = InMemoryBus::default();
        for n in 0..3 {
            bus.publish("t", None, json!(n)).await.unwrap();
        }

        let mut stream = bus.subscribe("t", StartPosition::Earliest).await.unwrap();
        bus.publish("t", None, json!(3)).await.unwrap();

        for expected in 0..4 {
            assert_eq!(next_offset(&mut stream).await, expected);
        }
    }

    #[tokio::test]
    async fn test_offset_start_and_retention() {
        let bus = InMemoryBus::new(&BusConfig { capacity: 16, retention: 3 });
        for n in 0..6 {
            bus.publish("t", None, json!(n)).await.unwrap();
        }

        let mut from_four = bus.subscribe("t", StartPosition::Offset(4)).await.unwrap();
        assert_eq!(next_offset(&mut from_four).await, 4);
        assert_eq!(next_offset(&mut from_four).await, 5);

        // Offsets 0..=2 fell out of the log
        let mut earliest = bus.subscribe("t", StartPosition::Earliest).await.unwrap();
        assert_eq!(next_offset(&mut earliest).await, 3);
        assert_eq!(bus.end_offset("t").await, 6);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_consumer() {
        let bus = InMemoryBus::default();

        let first = bus.subscribe("t", StartPosition::Latest).await.unwrap();
        let second = bus.subscribe("t", StartPosition::Latest).await.unwrap();
        assert_eq!(bus.consumer_count("t").await, 2);

        drop(first);
        assert_eq!(bus.consumer_count("t").await, 1);

        drop(second);
        assert_eq!(bus.consumer_count("t").await, 0);
    }

    #[tokio::test]
    async fn test_slow_consumer_reports_lag() {
        let bus = InMemoryBus::new(&BusConfig { capacity: 2, retention: 100 });
        let mut stream = bus.subscribe("t", StartPosition::Latest).await.unwrap();

        for n in 0..5 {
            bus.publish("t", None, json!(n)).await.unwrap();
        }

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(WorkflowError::Bus(_))));
        assert_eq!(next_offset(&mut stream).await, 3);
    }
}
