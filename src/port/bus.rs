//! Message bus port
//!
//! The workflow only needs two things from a transport: append a payload to a
//! topic, and read a topic as an endless stream starting at some position.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::error::WorkflowError;

/// A record as read back from a topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRecord {
    pub topic:     String,
    /// Position within the topic, strictly increasing per topic
    pub offset:    u64,
    pub key:       Option<String>,
    pub payload:   serde_json::Value,
    pub timestamp: DateTime<Utc>
}

impl BusRecord {
    /// Decode the payload into a typed event
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, WorkflowError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            WorkflowError::Serialization(format!("record {}@{} is not decodable: {}", self.topic, self.offset, e))
        })
    }
}

/// Where a new subscription starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Only records published after subscribing
    #[default]
    Latest,
    /// Everything the topic still retains
    Earliest,
    /// Retained records from this offset on
    Offset(u64)
}

/// Endless stream of records; dropping it releases the consumer
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<BusRecord, WorkflowError>> + Send>>;

/// Port for the publish/subscribe transport
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Append a payload to `topic`, returning its offset
    async fn publish(
        &self,
        topic: &str,
        key: Option<String>,
        payload: serde_json::Value
    ) -> Result<u64, WorkflowError>;

    /// Open a new consumer on `topic`
    async fn subscribe(&self, topic: &str, start: StartPosition) -> Result<RecordStream, WorkflowError>;
}
