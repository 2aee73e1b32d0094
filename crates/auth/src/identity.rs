//! Cached service-to-service identity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use common::{Role, UserId};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::token::TokenAuthority;

/// The `sub` claim carried by every service token.
pub const SERVICE_SUBJECT: &str = "service_account";

/// Lifetime of a freshly minted service token.
pub const SERVICE_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Mints and memoizes the token a service presents to its peers.
///
/// One instance lives for the whole process and is shared by every outbound
/// peer client. Readers take a shared lock; a refresh takes the exclusive lock
/// and re-checks expiry, so concurrent callers that all observe an expired
/// token still produce exactly one new token.
pub struct ServiceIdentityCache {
    authority: Arc<TokenAuthority>,
    ttl: Duration,
    cached: RwLock<Option<CachedToken>>,
    mints: AtomicU64,
}

impl ServiceIdentityCache {
    /// Creates an empty cache; the first call to
    /// [`service_token`](Self::service_token) mints.
    pub fn new(authority: Arc<TokenAuthority>) -> Self {
        Self::with_ttl(authority, Duration::seconds(SERVICE_TOKEN_TTL_SECS))
    }

    /// Creates a cache whose tokens live for `ttl`.
    pub fn with_ttl(authority: Arc<TokenAuthority>, ttl: Duration) -> Self {
        Self {
            authority,
            ttl,
            cached: RwLock::new(None),
            mints: AtomicU64::new(0),
        }
    }

    /// Returns the current service token, minting a replacement if none is
    /// cached or the cached one has reached its expiry.
    pub async fn service_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(current) = cached.as_ref()
                && self.authority.now() < current.expires_at
            {
                return Ok(current.token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // another caller may have refreshed while we waited for the lock
        if let Some(current) = cached.as_ref()
            && self.authority.now() < current.expires_at
        {
            return Ok(current.token.clone());
        }

        let issued =
            self.authority
                .issue(SERVICE_SUBJECT, Role::Service, UserId::SERVICE_ACCOUNT, self.ttl)?;
        self.mints.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("service_tokens_minted_total").increment(1);
        tracing::info!(expires_at = %issued.expires_at, "minted service token");

        let token = issued.token.clone();
        *cached = Some(CachedToken {
            token: issued.token,
            expires_at: issued.expires_at,
        });
        Ok(token)
    }

    /// Returns how many tokens this cache has minted.
    pub fn mint_count(&self) -> u64 {
        self.mints.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ServiceIdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceIdentityCache")
            .field("ttl", &self.ttl)
            .field("mints", &self.mint_count())
            .finish_non_exhaustive()
    }
}
