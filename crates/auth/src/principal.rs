use chrono::{DateTime, Utc};
use common::{Role, UserId};

/// The authenticated identity attached to one request.
///
/// Only [`TokenAuthority::validate`](crate::TokenAuthority::validate) builds
/// one; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// The `sub` claim: an email for end users, `service_account` for services.
    pub subject: String,
    pub role: Role,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}
