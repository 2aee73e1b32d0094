//! Local persistence for the order and payment services.
//!
//! Each service owns its own database. Writes that must land together (an
//! order and its items) go through one transaction; nothing here spans
//! services.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderRepository, InMemoryPaymentRepository};
pub use postgres::{PostgresOrderRepository, PostgresPaymentRepository};
pub use records::{NewOrder, NewOrderItem, NewPayment, Order, OrderItem, Payment};
pub use repository::{OrderRepository, PaymentRepository};
