//! Payment creation saga.

use auth::Principal;
use common::{OrderId, amounts_match};
use peers::OrderClient;
use publisher::{EventPublisher, PaymentSettledEvent, publish_event};
use serde::Deserialize;
use store::{NewPayment, Payment, PaymentRepository};

use crate::access;
use crate::error::{Result, SagaError};
use crate::run::SagaRun;

/// The saga type identifier for payment creation.
pub const SAGA_TYPE: &str = "payment_creation";

/// Step name: check the caller may pay at all.
pub const STEP_VALIDATE_AUTHORIZATION: &str = "validate_authorization";

/// Step name: load the order from the order service.
pub const STEP_FETCH_ORDER: &str = "fetch_order";

/// Step name: check ownership and that the amount covers the order.
pub const STEP_VERIFY_OWNERSHIP_AND_AMOUNT: &str = "verify_ownership_and_amount";

/// Step name: check the order status allows payment.
pub const STEP_VERIFY_ORDER_PAYABLE: &str = "verify_order_payable";

/// Step name: write the payment as pending and settle it, in one transaction.
pub const STEP_PERSIST_AND_SETTLE: &str = "persist_and_settle";

/// Step name: announce the settled payment.
pub const STEP_PUBLISH_EVENT: &str = "publish_event";

/// A payment as submitted by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentDraft {
    pub order_id: OrderId,
    pub amount: f64,
    #[serde(rename = "payment_method")]
    pub method: String,
}

/// Orchestrates the order lookup, payment persistence and the
/// `payments_queue` event.
pub struct PaymentCreationSaga<R, O, P>
where
    R: PaymentRepository,
    O: OrderClient,
    P: EventPublisher,
{
    payments: R,
    orders: O,
    publisher: P,
}

impl<R, O, P> PaymentCreationSaga<R, O, P>
where
    R: PaymentRepository,
    O: OrderClient,
    P: EventPublisher,
{
    pub fn new(payments: R, orders: O, publisher: P) -> Self {
        Self {
            payments,
            orders,
            publisher,
        }
    }

    /// Runs the saga and returns the settled payment.
    #[tracing::instrument(
        skip(self, principal, draft),
        fields(saga_type = SAGA_TYPE, caller = %principal.user_id, order_id = %draft.order_id)
    )]
    pub async fn execute(&self, principal: &Principal, draft: PaymentDraft) -> Result<Payment> {
        let run = SagaRun::start(SAGA_TYPE);

        match self.run(&run, principal, draft).await {
            Ok(payment) => {
                metrics::counter!("payments_settled_total").increment(1);
                run.finish("completed");
                Ok(payment)
            }
            Err(e) => {
                metrics::counter!("payments_rejected_total", "reason" => e.reason()).increment(1);
                run.finish("rejected");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        run: &SagaRun,
        principal: &Principal,
        draft: PaymentDraft,
    ) -> Result<Payment> {
        run.step(STEP_VALIDATE_AUTHORIZATION);
        authorize(principal, &draft).map_err(|e| run.fail(STEP_VALIDATE_AUTHORIZATION, e))?;

        run.step(STEP_FETCH_ORDER);
        let order = self
            .orders
            .fetch_order(draft.order_id)
            .await
            .map_err(|e| run.fail(STEP_FETCH_ORDER, SagaError::from_order_lookup(e)))?;

        run.step(STEP_VERIFY_OWNERSHIP_AND_AMOUNT);
        access::require_owner(
            principal,
            order.user_id,
            "You cannot pay for orders not belonging to you",
        )
        .map_err(|e| run.fail(STEP_VERIFY_OWNERSHIP_AND_AMOUNT, e))?;
        if !amounts_match(order.total_price, draft.amount) {
            return Err(run.fail(
                STEP_VERIFY_OWNERSHIP_AND_AMOUNT,
                SagaError::AmountMismatch {
                    amount: draft.amount,
                    total: order.total_price,
                },
            ));
        }

        run.step(STEP_VERIFY_ORDER_PAYABLE);
        if !order.status.is_payable() {
            return Err(run.fail(
                STEP_VERIFY_ORDER_PAYABLE,
                SagaError::NotPayable {
                    status: order.status,
                },
            ));
        }

        run.step(STEP_PERSIST_AND_SETTLE);
        let payment = self
            .payments
            .create_settled_payment(NewPayment {
                order_id: order.order_id,
                amount: draft.amount,
                method: draft.method,
            })
            .await
            .map_err(|e| run.fail(STEP_PERSIST_AND_SETTLE, e.into()))?;

        run.step(STEP_PUBLISH_EVENT);
        let event = PaymentSettledEvent {
            payment_id: payment.id,
            order_id: payment.order_id,
            status: payment.status,
            amount: payment.amount,
        };
        if let Err(e) = publish_event(&self.publisher, &event).await {
            tracing::error!(
                payment_id = %payment.id,
                error = %e,
                "payment settled but event was not published"
            );
        }

        Ok(payment)
    }
}

fn authorize(principal: &Principal, draft: &PaymentDraft) -> Result<()> {
    access::require_creator(principal, "Only users or admins can create payments")?;

    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(SagaError::Validation("Amount must be positive".into()));
    }
    if draft.method.trim().is_empty() {
        return Err(SagaError::Validation(
            "Payment method must not be empty".into(),
        ));
    }
    Ok(())
}
