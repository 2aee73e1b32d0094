use std::sync::Arc;

use async_trait::async_trait;

use crate::{IntegrationEvent, Result};

/// Sends a payload to a named durable queue.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `payload` to the queue `topic` with persistent delivery.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        (**self).publish(topic, payload).await
    }
}

/// Encodes `event` as JSON and publishes it to its queue.
///
/// Records `events_published_total` or `events_publish_failed_total`.
pub async fn publish_event<P, E>(publisher: &P, event: &E) -> Result<()>
where
    P: EventPublisher + ?Sized,
    E: IntegrationEvent + Sync,
{
    let result = match serde_json::to_vec(event) {
        Ok(payload) => publisher.publish(E::TOPIC, &payload).await,
        Err(e) => Err(e.into()),
    };

    match &result {
        Ok(()) => metrics::counter!("events_published_total", "topic" => E::TOPIC).increment(1),
        Err(_) => {
            metrics::counter!("events_publish_failed_total", "topic" => E::TOPIC).increment(1)
        }
    }
    result
}
