use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::{EventPublisher, PublishError, Result};

/// A message captured by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Decodes the JSON payload.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory publisher for testing.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    messages: Arc<RwLock<Vec<PublishedMessage>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish fail as if the broker were down.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns everything published so far, in order.
    pub async fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.read().await.clone()
    }

    /// Returns the messages published to `topic`.
    pub async fn messages_for(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PublishError::Connection("broker unavailable".into()));
        }
        self.messages.write().await.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}
