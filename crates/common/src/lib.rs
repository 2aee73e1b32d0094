//! Types shared by every storefront service.
//!
//! Identifiers are plain integers on the wire but distinct types in code so an
//! order id can never be passed where a product id is expected.

pub mod money;
pub mod role;
pub mod status;
pub mod types;

pub use money::{PRICE_TOLERANCE, amounts_match};
pub use role::Role;
pub use status::{OrderStatus, ParseStatusError, PaymentStatus};
pub use types::{OrderId, PaymentId, ProductId, UserId};
