//! Who may do what with orders and payments.
//!
//! | Operation            | user       | admin | seller               | service |
//! |----------------------|------------|-------|----------------------|---------|
//! | create order/payment | own only   | any   | no                   | no      |
//! | view one order       | own only   | any   | has own product      | any     |
//! | list orders          | no         | all   | with own products    | no      |
//! | update order status  | no         | yes   | no                   | no      |

use auth::Principal;
use common::{Role, UserId};

use crate::error::{Result, SagaError};

/// Which orders a principal may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Every order.
    All,
    /// Orders placed by this user.
    PlacedBy(UserId),
    /// Orders containing at least one product sold by this seller.
    SoldBy(UserId),
}

/// Rejects roles that may not start an order or payment.
pub fn require_creator(principal: &Principal, denied: &'static str) -> Result<()> {
    match principal.role {
        Role::User | Role::Admin => Ok(()),
        Role::Seller | Role::Service => Err(SagaError::Forbidden(denied)),
    }
}

/// Rejects a `user` acting on something owned by someone else.
pub fn require_owner(principal: &Principal, owner: UserId, denied: &'static str) -> Result<()> {
    if principal.role == Role::User && principal.user_id != owner {
        return Err(SagaError::Forbidden(denied));
    }
    Ok(())
}

/// Rejects everyone except `admin`.
pub fn require_admin(principal: &Principal, denied: &'static str) -> Result<()> {
    if principal.role != Role::Admin {
        return Err(SagaError::Forbidden(denied));
    }
    Ok(())
}

/// Scope for reading a single order.
pub fn read_scope(principal: &Principal) -> OrderScope {
    match principal.role {
        Role::Admin | Role::Service => OrderScope::All,
        Role::User => OrderScope::PlacedBy(principal.user_id),
        Role::Seller => OrderScope::SoldBy(principal.user_id),
    }
}

/// Scope for listing orders, or `None` if the role may not list.
pub fn list_scope(principal: &Principal) -> Option<OrderScope> {
    match principal.role {
        Role::Admin => Some(OrderScope::All),
        Role::Seller => Some(OrderScope::SoldBy(principal.user_id)),
        Role::User | Role::Service => None,
    }
}
