//! Signing and validating bearer tokens.
//!
//! Tokens are HMAC-signed JWTs over a secret shared by every service. The
//! claims are `sub`, `role`, `user_id`, `exp` and `iat`.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{Role, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, Result};
use crate::principal::Principal;

/// HMAC variant used to sign tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl Algorithm {
    /// Returns the `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }

    fn to_jwt(self) -> jsonwebtoken::Algorithm {
        match self {
            Algorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            Algorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            Algorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            other => Err(AuthError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct Claims<'a> {
    sub: &'a str,
    role: &'a str,
    user_id: i64,
    exp: i64,
    iat: i64,
}

/// Claims as presented; any of them may be absent.
#[derive(Deserialize)]
struct PresentedClaims {
    sub: Option<String>,
    role: Option<String>,
    user_id: Option<i64>,
    exp: Option<i64>,
}

/// Issues and validates tokens for the whole trust domain.
///
/// Holds no per-token state, so one instance is shared by every request
/// handler of a service.
#[derive(Clone)]
pub struct TokenAuthority {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    algorithm: Algorithm,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Creates an authority over `secret` using the wall clock.
    pub fn new(secret: impl AsRef<[u8]>, algorithm: Algorithm) -> Result<Self> {
        Self::with_clock(secret, algorithm, Arc::new(SystemClock))
    }

    /// Creates an authority that reads time from `clock`.
    pub fn with_clock(
        secret: impl AsRef<[u8]>,
        algorithm: Algorithm,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        // Expiry is compared against `clock` in `validate`, not the system time.
        let mut validation = Validation::new(algorithm.to_jwt());
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string()]);

        Ok(Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret)),
            decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            validation,
            algorithm,
            clock,
        })
    }

    /// Returns the configured algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the current time as seen by this authority.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Signs a token for `subject` valid for `ttl` from now.
    ///
    /// Expiry is carried in whole seconds; the returned `expires_at` is the
    /// same truncated instant the token encodes.
    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        user_id: UserId,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        let now = self.clock.now();
        let exp = (now + ttl).timestamp();
        let expires_at = DateTime::from_timestamp(exp, 0).unwrap_or(now + ttl);

        let claims = Claims {
            sub: subject,
            role: role.as_str(),
            user_id: user_id.as_i64(),
            exp,
            iat: now.timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(self.algorithm.to_jwt()),
            &claims,
            &self.encoding_key,
        )
        .map_err(AuthError::Encoding)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verifies `token` and extracts the principal it names.
    ///
    /// The signature is checked before any claim is trusted. A token whose
    /// header names another algorithm fails as [`AuthError::InvalidSignature`].
    pub fn validate(&self, token: &str) -> Result<Principal> {
        // an unreadable header is a bad token, not bad claims
        jsonwebtoken::decode_header(token).map_err(|_| AuthError::InvalidSignature)?;

        let claims =
            jsonwebtoken::decode::<PresentedClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => {
                        AuthError::MalformedClaims
                    }
                    _ => AuthError::InvalidSignature,
                })?
                .claims;

        let exp = claims.exp.ok_or(AuthError::MalformedClaims)?;
        if self.clock.now().timestamp() >= exp {
            return Err(AuthError::Expired);
        }
        let expires_at = DateTime::from_timestamp(exp, 0).ok_or(AuthError::MalformedClaims)?;

        let (Some(subject), Some(role), Some(user_id)) = (claims.sub, claims.role, claims.user_id)
        else {
            return Err(AuthError::MalformedClaims);
        };
        let role = Role::parse(&role).ok_or(AuthError::MalformedClaims)?;

        Ok(Principal {
            subject,
            role,
            user_id: UserId::new(user_id),
            expires_at,
        })
    }
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("algorithm", &self.algorithm)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
