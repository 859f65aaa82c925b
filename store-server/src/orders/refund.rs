//! Refund workflow
//!
//! Refunds against PAID orders, recorded as a PAID -> REFUNDED
//! transition with the amount and reason in the audit note. Any
//! positive amount up to the order total is accepted; the amount lives
//! in the note, not in a schema column.

use shared::models::Order;
use shared::order::PaymentStatus;
use thiserror::Error;
use tracing::info;

use super::ledger::{Actor, LedgerError, OrderLedger, TransitionTarget};
use super::money::MONEY_TOLERANCE;

#[derive(Debug, Error)]
pub enum RefundError {
    #[error("Refunds require an admin operator")]
    OperatorRequired,

    #[error("{0}")]
    Validation(String),

    #[error("Order {order_id} is {status:?}, only PAID orders can be refunded")]
    NotPaid {
        order_id: i64,
        status: PaymentStatus,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Clone)]
pub struct RefundWorkflow {
    ledger: OrderLedger,
}

impl RefundWorkflow {
    pub fn new(ledger: OrderLedger) -> Self {
        Self { ledger }
    }

    /// Refund a PAID order. The amount must be positive and no more
    /// than the order total (within money tolerance).
    pub async fn refund(
        &self,
        order_id: i64,
        amount: f64,
        reason: &str,
        actor: &Actor,
    ) -> Result<Order, RefundError> {
        if !actor.is_admin() {
            return Err(RefundError::OperatorRequired);
        }
        if reason.trim().is_empty() {
            return Err(RefundError::Validation("reason is required".into()));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RefundError::Validation(
                "refund amount must be positive".into(),
            ));
        }

        let order = self.ledger.get(order_id).await?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(RefundError::NotPaid {
                order_id,
                status: order.payment_status,
            });
        }
        if amount > order.total + MONEY_TOLERANCE {
            return Err(RefundError::Validation(format!(
                "refund amount {amount:.2} exceeds order total {:.2}",
                order.total
            )));
        }

        let note = format!("Refunded {amount:.2}: {}", reason.trim());
        let order = self
            .ledger
            .apply_transition(
                order_id,
                TransitionTarget::Payment(PaymentStatus::Refunded),
                actor,
                Some(&note),
            )
            .await?;

        info!(
            order_id,
            order_number = %order.order_number,
            amount,
            "Order refunded"
        );
        Ok(order)
    }
}
