//! Multi-service write operations.
//!
//! Two sagas live here:
//! 1. Order creation: authorize, price every item against the catalog,
//!    verify the declared total, persist, publish.
//! 2. Payment creation: authorize, fetch the order from the order service,
//!    verify ownership, amount and status, persist the settled payment,
//!    publish.
//!
//! There are no compensating steps. Everything that can fail runs before the
//! single local transaction, and publishing afterwards is best effort.

pub mod access;
pub mod error;
pub mod order_creation;
pub mod payment_creation;
pub mod queries;
mod run;

pub use access::OrderScope;
pub use error::{Result, SagaError};
pub use order_creation::{DraftItem, OrderCreationSaga, OrderDraft};
pub use payment_creation::{PaymentCreationSaga, PaymentDraft};
pub use queries::{OrderService, PaymentService};
