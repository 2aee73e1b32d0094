//! Token-based trust between services.
//!
//! Every service shares one symmetric secret. The same [`TokenAuthority`]
//! signs end-user tokens at login, validates whatever token a caller presents,
//! and mints the service token that a [`ServiceIdentityCache`] hands out for
//! outbound peer calls.

pub mod clock;
pub mod error;
pub mod identity;
pub mod principal;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, Result};
pub use identity::{SERVICE_SUBJECT, SERVICE_TOKEN_TTL_SECS, ServiceIdentityCache};
pub use principal::Principal;
pub use token::{Algorithm, IssuedToken, TokenAuthority};
