use auth::AuthError;
use thiserror::Error;

/// Typed failure of a peer call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeerError {
    /// The peer could not be reached or did not answer in time.
    #[error("peer unavailable: {0}")]
    Unavailable(String),

    /// The peer reported that the requested object does not exist.
    #[error("not found")]
    NotFound,

    /// The peer answered with a non-success status other than 404.
    #[error("peer rejected request with status {status}")]
    BadRequest { status: u16 },

    /// The peer answered 2xx with a body of the wrong shape.
    #[error("invalid peer response: {0}")]
    InvalidResponse(String),

    /// No service token could be produced for the call.
    #[error("service identity unavailable: {0}")]
    Identity(String),
}

impl PeerError {
    /// Short label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            PeerError::Unavailable(_) => "unavailable",
            PeerError::NotFound => "not_found",
            PeerError::BadRequest { .. } => "bad_request",
            PeerError::InvalidResponse(_) => "invalid_response",
            PeerError::Identity(_) => "identity",
        }
    }
}

impl From<AuthError> for PeerError {
    fn from(err: AuthError) -> Self {
        PeerError::Identity(err.to_string())
    }
}

/// Result type for peer calls.
pub type Result<T> = std::result::Result<T, PeerError>;
