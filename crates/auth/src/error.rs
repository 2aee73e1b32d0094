//! Token error types.

use thiserror::Error;

/// Errors raised while issuing or validating tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token is not a well-formed signed token, or the signature does not
    /// verify against the shared secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token verified but its expiry has passed.
    #[error("token expired")]
    Expired,

    /// The token verified but `sub`, `role`, `user_id` or `exp` is missing or
    /// not usable.
    #[error("token claims are missing or malformed")]
    MalformedClaims,

    /// The configured signing algorithm is not supported.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The shared secret is empty.
    #[error("token signing secret must not be empty")]
    MissingSecret,

    /// The token could not be signed.
    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Returns true if the error means the presented token must be refused.
    ///
    /// Callers answer every such case the same way and never reveal which
    /// check failed.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidSignature | AuthError::Expired | AuthError::MalformedClaims
        )
    }
}

/// Convenience type alias for token results.
pub type Result<T> = std::result::Result<T, AuthError>;
