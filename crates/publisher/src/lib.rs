//! Integration events and the publishers that carry them.
//!
//! Publishing happens after the local write has committed and is never part
//! of that write. Callers decide what a failed publish means for them.

pub mod amqp;
pub mod error;
pub mod events;
pub mod memory;
pub mod publisher;

pub use amqp::{AmqpPublisher, DEFAULT_PUBLISH_TIMEOUT};
pub use error::{PublishError, Result};
pub use events::{
    IntegrationEvent, ORDERS_QUEUE, OrderCreatedEvent, OrderCreatedItem, PAYMENTS_QUEUE,
    PaymentSettledEvent,
};
pub use memory::{InMemoryPublisher, PublishedMessage};
pub use publisher::{EventPublisher, publish_event};
