//! Request extractors.

use std::sync::Arc;

use auth::{Principal, TokenAuthority};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;

/// Detail for a request without a usable `Authorization` header.
pub const MISSING_TOKEN_DETAIL: &str = "Not authenticated";

/// Detail for every refused token. The cause is logged, never returned.
pub const INVALID_TOKEN_DETAIL: &str = "Invalid or expired token";

/// The validated caller of a request.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<TokenAuthority>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized(MISSING_TOKEN_DETAIL))?;

        let authority = Arc::<TokenAuthority>::from_ref(state);
        match authority.validate(token) {
            Ok(principal) => Ok(Authenticated(principal)),
            Err(e) => {
                tracing::debug!(error = %e, "token refused");
                metrics::counter!("auth_rejections_total").increment(1);
                Err(ApiError::Unauthorized(INVALID_TOKEN_DETAIL))
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
