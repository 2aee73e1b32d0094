use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while publishing an event.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker could not be reached.
    #[error("broker connection failed: {0}")]
    Connection(String),

    /// The queue could not be declared.
    #[error("failed to declare queue {queue}: {reason}")]
    Declare { queue: String, reason: String },

    /// The broker refused the message.
    #[error("failed to publish to {queue}: {reason}")]
    Publish { queue: String, reason: String },

    /// The broker did not finish the exchange in time.
    #[error("publishing to {queue} timed out after {after:?}")]
    Timeout { queue: String, after: Duration },

    /// The event could not be encoded.
    #[error("failed to encode event: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Result type for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;
