//! Order creation saga.
//!
//! Every check that can fail runs before the order is written, so a failed
//! run leaves nothing behind. The event is published after the commit and a
//! publish failure does not undo the order.

use auth::Principal;
use common::{ProductId, UserId, amounts_match};
use peers::CatalogClient;
use publisher::{EventPublisher, OrderCreatedEvent, OrderCreatedItem, publish_event};
use serde::Deserialize;
use store::{NewOrder, NewOrderItem, Order, OrderRepository};

use crate::access;
use crate::error::{Result, SagaError};
use crate::run::SagaRun;

/// The saga type identifier for order creation.
pub const SAGA_TYPE: &str = "order_creation";

/// Step name: check the caller may place this order.
pub const STEP_VALIDATE_AUTHORIZATION: &str = "validate_authorization";

/// Step name: look up the authoritative price of every item.
pub const STEP_PRICE_EACH_ITEM: &str = "price_each_item";

/// Step name: compare the declared total with the priced total.
pub const STEP_VERIFY_TOTAL: &str = "verify_total";

/// Step name: write the order and its items.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: announce the new order.
pub const STEP_PUBLISH_EVENT: &str = "publish_event";

/// One requested line of a draft.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DraftItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An order as submitted by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub items: Vec<DraftItem>,
    /// The total the client expects to pay.
    pub total_price: f64,
}

/// Orchestrates catalog pricing, persistence and the `orders_queue` event.
pub struct OrderCreationSaga<R, C, P>
where
    R: OrderRepository,
    C: CatalogClient,
    P: EventPublisher,
{
    orders: R,
    catalog: C,
    publisher: P,
}

impl<R, C, P> OrderCreationSaga<R, C, P>
where
    R: OrderRepository,
    C: CatalogClient,
    P: EventPublisher,
{
    pub fn new(orders: R, catalog: C, publisher: P) -> Self {
        Self {
            orders,
            catalog,
            publisher,
        }
    }

    /// Runs the saga and returns the committed order.
    #[tracing::instrument(
        skip(self, principal, draft),
        fields(saga_type = SAGA_TYPE, caller = %principal.user_id, user_id = %draft.user_id)
    )]
    pub async fn execute(&self, principal: &Principal, draft: OrderDraft) -> Result<Order> {
        let run = SagaRun::start(SAGA_TYPE);

        match self.run(&run, principal, draft).await {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                run.finish("completed");
                Ok(order)
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.reason()).increment(1);
                run.finish("rejected");
                Err(e)
            }
        }
    }

    async fn run(&self, run: &SagaRun, principal: &Principal, draft: OrderDraft) -> Result<Order> {
        run.step(STEP_VALIDATE_AUTHORIZATION);
        let quantities = authorize(principal, &draft)
            .map_err(|e| run.fail(STEP_VALIDATE_AUTHORIZATION, e))?;

        run.step(STEP_PRICE_EACH_ITEM);
        let mut items = Vec::with_capacity(draft.items.len());
        for (item, quantity) in draft.items.iter().zip(quantities) {
            let product = self
                .catalog
                .fetch_product(item.product_id)
                .await
                .map_err(|e| {
                    run.fail(
                        STEP_PRICE_EACH_ITEM,
                        SagaError::from_catalog(item.product_id, e),
                    )
                })?;
            items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name,
                quantity,
                price: product.price,
            });
        }

        run.step(STEP_VERIFY_TOTAL);
        let computed = priced_total(&items);
        if !amounts_match(computed, draft.total_price) {
            return Err(run.fail(
                STEP_VERIFY_TOTAL,
                SagaError::PriceMismatch {
                    declared: draft.total_price,
                    computed,
                },
            ));
        }

        run.step(STEP_PERSIST_ORDER);
        let order = self
            .orders
            .create_order(NewOrder {
                user_id: draft.user_id,
                total_price: computed,
                items,
            })
            .await
            .map_err(|e| run.fail(STEP_PERSIST_ORDER, e.into()))?;

        run.step(STEP_PUBLISH_EVENT);
        let event = OrderCreatedEvent {
            order_id: order.id,
            user_id: order.user_id,
            total_price: order.total_price,
            status: order.status,
            items: order
                .items
                .iter()
                .map(|i| OrderCreatedItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
        };
        if let Err(e) = publish_event(&self.publisher, &event).await {
            tracing::error!(
                order_id = %order.id,
                error = %e,
                "order created but event was not published"
            );
        }

        Ok(order)
    }
}

/// Checks the caller and the draft fields, returning each item's quantity.
///
/// Quantities are bounded by the `INTEGER` column they are stored in.
fn authorize(principal: &Principal, draft: &OrderDraft) -> Result<Vec<u32>> {
    access::require_creator(principal, "Only users or admins can create orders")?;
    access::require_owner(
        principal,
        draft.user_id,
        "You can only create orders for yourself",
    )?;

    if draft.items.is_empty() {
        return Err(SagaError::Validation(
            "Order must contain at least one item".into(),
        ));
    }
    if !draft.total_price.is_finite() || draft.total_price <= 0.0 {
        return Err(SagaError::Validation(
            "Total price must be positive".into(),
        ));
    }

    draft
        .items
        .iter()
        .map(|item| match item.quantity {
            q if q <= 0 => Err(SagaError::Validation(format!(
                "Quantity for product {} must be positive",
                item.product_id
            ))),
            q => i32::try_from(q).map(i32::unsigned_abs).map_err(|_| {
                SagaError::Validation(format!(
                    "Quantity for product {} must not exceed {}",
                    item.product_id,
                    i32::MAX
                ))
            }),
        })
        .collect()
}

/// Sum of `price × quantity` over all lines.
fn priced_total(items: &[NewOrderItem]) -> f64 {
    items
        .iter()
        .map(|i| i.price * f64::from(i.quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: f64, quantity: u32) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(1),
            product_name: "x".into(),
            quantity,
            price,
        }
    }

    #[test]
    fn test_priced_total() {
        let total = priced_total(&[line(9.99, 2), line(0.02, 1)]);
        assert!((total - 20.0).abs() < 1e-9);
    }

    fn draft(quantity: i64) -> OrderDraft {
        OrderDraft {
            user_id: UserId::new(7),
            items: vec![DraftItem {
                product_id: ProductId::new(1),
                quantity,
            }],
            total_price: 10.0,
        }
    }

    fn buyer() -> Principal {
        Principal {
            subject: "ann@example.com".into(),
            role: common::Role::User,
            user_id: UserId::new(7),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn test_quantity_bounds() {
        let max = i64::from(i32::MAX);
        assert_eq!(authorize(&buyer(), &draft(1)).unwrap(), vec![1]);
        assert_eq!(
            authorize(&buyer(), &draft(max)).unwrap(),
            vec![i32::MAX.unsigned_abs()]
        );

        match authorize(&buyer(), &draft(max + 1)) {
            Err(SagaError::Validation(msg)) => {
                assert_eq!(msg, "Quantity for product 1 must not exceed 2147483647")
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
        for quantity in [0, -1, i64::MIN] {
            match authorize(&buyer(), &draft(quantity)) {
                Err(SagaError::Validation(msg)) => {
                    assert_eq!(msg, "Quantity for product 1 must be positive")
                }
                other => panic!("expected a validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_priced_total_empty_and_single_line() {
        assert_eq!(priced_total(&[]), 0.0);
        assert_eq!(priced_total(&[line(5.0, 3)]), 15.0);
    }
}
