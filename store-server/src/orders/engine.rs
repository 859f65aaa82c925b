//! Payment reconciliation engine
//!
//! The order ledger never talks to a provider; this engine sits between
//! the two. Every inbound claim of payment (webhook, manual reconcile)
//! is verified against the provider before any state changes, and the
//! amount must match the order total. Verification is idempotent: a
//! repeated callback that confirms the current state is a no-op and
//! appends nothing to history.
//!
//! A gateway timeout is treated as "unknown", never as failure — the
//! caller gets an upstream error and the order is left untouched, the
//! provider will retry.

use std::sync::Arc;

use serde::Serialize;
use shared::models::{Order, PaymentMethod};
use shared::order::{OrderStatus, PaymentStatus};
use thiserror::Error;
use tracing::{info, warn};

use super::ledger::{Actor, LedgerError, OrderLedger, TransitionTarget};
use super::money;
use super::notify::OrderNotifier;
use crate::gateways::{
    CallbackLinkage, GatewayError, GatewayRegistry, PaymentVerification, VerifiedStatus,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Unknown payment provider: {0}")]
    UnknownProvider(String),

    #[error("Callback linkage does not match order {0}")]
    LinkageMismatch(i64),

    #[error("Verified amount {verified:.2} does not match order total {expected:.2}")]
    AmountMismatch { verified: f64, expected: f64 },

    #[error("{0}")]
    Validation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// What a verified callback did to the order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Payment status changed
    Applied(PaymentStatus),
    /// Verification confirmed the current state; nothing written
    NoOp,
    /// Provider still reports the payment in flight; nothing written
    PendingVerification,
    /// Verified state conflicts with a settled order (e.g. FAILED after
    /// PAID); logged and dropped
    Ignored,
}

/// Redirect target for a freshly initiated payment
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub order_id: i64,
    pub payment_url: String,
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    ledger: OrderLedger,
    gateways: Arc<GatewayRegistry>,
    notifier: OrderNotifier,
}

impl ReconciliationEngine {
    pub fn new(ledger: OrderLedger, gateways: Arc<GatewayRegistry>, notifier: OrderNotifier) -> Self {
        Self {
            ledger,
            gateways,
            notifier,
        }
    }

    /// Start a hosted checkout session for a PENDING or FAILED order.
    /// FAILED orders are moved back to PENDING first (retry).
    pub async fn initiate_payment(&self, order_id: i64) -> EngineResult<PaymentInitiation> {
        let order = self.ledger.get(order_id).await?;

        if !order.payment_method.is_hosted() {
            return Err(EngineError::Validation(
                "cash on delivery has no hosted checkout".into(),
            ));
        }
        let order = match order.payment_status {
            PaymentStatus::Pending => order,
            PaymentStatus::Failed => {
                self.ledger
                    .apply_transition(
                        order_id,
                        TransitionTarget::Payment(PaymentStatus::Pending),
                        &Actor::system(),
                        Some("Payment retry"),
                    )
                    .await?
            }
            other => {
                return Err(EngineError::Validation(format!(
                    "order is {other:?}, cannot initiate payment"
                )))
            }
        };

        let adapter = self.gateways.get(order.payment_method)?;
        let linkage = CallbackLinkage::new(order.id);
        let outcome = adapter.initiate(&order, &linkage).await?;

        self.ledger
            .record_payment_initiation(order.id, &linkage.nonce, outcome.provider_ref.as_deref())
            .await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            provider = order.payment_method.as_str(),
            "Payment initiated"
        );
        Ok(PaymentInitiation {
            order_id: order.id,
            payment_url: outcome.payment_url,
        })
    }

    /// Handle a provider webhook. The claimed state in the callback body
    /// is never trusted — the provider is queried server-to-server.
    pub async fn handle_callback(
        &self,
        provider: &str,
        linkage: &CallbackLinkage,
    ) -> EngineResult<CallbackOutcome> {
        let method = parse_provider(provider)
            .ok_or_else(|| EngineError::UnknownProvider(provider.to_owned()))?;

        let order = self.ledger.get(linkage.order_id).await?;
        if order.payment_method != method {
            return Err(EngineError::LinkageMismatch(order.id));
        }
        match &order.payment_nonce {
            Some(nonce) if *nonce == linkage.nonce => {}
            _ => {
                warn!(order_id = order.id, "Callback nonce mismatch, rejecting");
                return Err(EngineError::LinkageMismatch(order.id));
            }
        }

        let reference = order.payment_ref.clone().ok_or_else(|| {
            EngineError::Validation(format!("order {} has no payment reference", order.id))
        })?;
        let adapter = self.gateways.get(method)?;
        let verification = adapter.verify(&reference).await?;

        self.apply_verification(&order, &verification).await
    }

    /// Manually re-query the provider for an order (admin action)
    pub async fn reconcile(&self, order_id: i64) -> EngineResult<CallbackOutcome> {
        let order = self.ledger.get(order_id).await?;
        if !order.payment_method.is_hosted() {
            return Err(EngineError::Validation(
                "cash on delivery is not reconciled against a provider".into(),
            ));
        }
        let reference = order.payment_ref.clone().ok_or_else(|| {
            EngineError::Validation(format!("order {order_id} has no payment reference"))
        })?;
        let adapter = self.gateways.get(order.payment_method)?;
        let verification = adapter.verify(&reference).await?;
        self.apply_verification(&order, &verification).await
    }

    /// Apply a provider-verified payment state to the ledger
    async fn apply_verification(
        &self,
        order: &Order,
        verification: &PaymentVerification,
    ) -> EngineResult<CallbackOutcome> {
        match verification.status {
            VerifiedStatus::Pending => Ok(CallbackOutcome::PendingVerification),

            VerifiedStatus::Completed => {
                if !money::amounts_match(verification.amount, order.total) {
                    return Err(EngineError::AmountMismatch {
                        verified: verification.amount,
                        expected: order.total,
                    });
                }
                match order.payment_status {
                    PaymentStatus::Paid => Ok(CallbackOutcome::NoOp),
                    PaymentStatus::Pending => {
                        self.mark_paid(order, verification).await?;
                        Ok(CallbackOutcome::Applied(PaymentStatus::Paid))
                    }
                    // A retry can complete at the provider after we saw
                    // the earlier attempt fail: walk back through
                    // PENDING so the history stays replayable.
                    PaymentStatus::Failed => {
                        self.ledger
                            .apply_transition(
                                order.id,
                                TransitionTarget::Payment(PaymentStatus::Pending),
                                &Actor::system(),
                                Some("Payment retry confirmed by provider"),
                            )
                            .await?;
                        self.mark_paid(order, verification).await?;
                        Ok(CallbackOutcome::Applied(PaymentStatus::Paid))
                    }
                    PaymentStatus::Refunded => {
                        warn!(
                            order_id = order.id,
                            "Provider reports COMPLETED for a refunded order, ignoring"
                        );
                        Ok(CallbackOutcome::Ignored)
                    }
                }
            }

            VerifiedStatus::Failed => match order.payment_status {
                PaymentStatus::Failed => Ok(CallbackOutcome::NoOp),
                PaymentStatus::Pending => {
                    self.ledger
                        .apply_transition(
                            order.id,
                            TransitionTarget::Payment(PaymentStatus::Failed),
                            &Actor::system(),
                            Some("Provider verified payment failure"),
                        )
                        .await?;
                    Ok(CallbackOutcome::Applied(PaymentStatus::Failed))
                }
                // Never un-pay an order on a late failure signal
                PaymentStatus::Paid | PaymentStatus::Refunded => {
                    warn!(
                        order_id = order.id,
                        current = order.payment_status.as_str(),
                        "Provider reports FAILED for a settled order, ignoring"
                    );
                    Ok(CallbackOutcome::Ignored)
                }
            },
        }
    }

    async fn mark_paid(
        &self,
        order: &Order,
        verification: &PaymentVerification,
    ) -> EngineResult<()> {
        if let Some(txn) = &verification.transaction_id {
            self.ledger.record_payment_ref(order.id, txn).await?;
        }
        let note = match &verification.transaction_id {
            Some(txn) => format!("Provider verified payment (txn {txn})"),
            None => "Provider verified payment".to_owned(),
        };
        self.ledger
            .apply_transition(
                order.id,
                TransitionTarget::Payment(PaymentStatus::Paid),
                &Actor::system(),
                Some(&note),
            )
            .await?;
        Ok(())
    }

    /// Admin fulfillment transition; emits a notification on success
    pub async fn admin_update_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
        actor: &Actor,
        note: Option<&str>,
    ) -> EngineResult<Order> {
        if !actor.is_admin() {
            return Err(EngineError::Validation(
                "an operator is required for admin transitions".into(),
            ));
        }
        let old = self.ledger.get(order_id).await?.status;
        let order = self
            .ledger
            .apply_transition(
                order_id,
                TransitionTarget::Fulfillment(new_status),
                actor,
                note,
            )
            .await?;
        self.notifier.status_changed(&order, old);
        Ok(order)
    }

    /// Admin payment transition (e.g. marking a COD order PAID on
    /// delivery)
    pub async fn admin_update_payment_status(
        &self,
        order_id: i64,
        new_status: PaymentStatus,
        actor: &Actor,
        note: Option<&str>,
    ) -> EngineResult<Order> {
        if !actor.is_admin() {
            return Err(EngineError::Validation(
                "an operator is required for admin transitions".into(),
            ));
        }
        Ok(self
            .ledger
            .apply_transition(order_id, TransitionTarget::Payment(new_status), actor, note)
            .await?)
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }
}

pub fn parse_provider(provider: &str) -> Option<PaymentMethod> {
    match provider {
        "bkash" => Some(PaymentMethod::Bkash),
        "nagad" => Some(PaymentMethod::Nagad),
        "sslcommerz" => Some(PaymentMethod::Sslcommerz),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::gateways::{GatewayResult, InitiateOutcome, PaymentGateway};
    use async_trait::async_trait;
    use shared::models::{OrderDraft, OrderItemDraft, OrderSource};
    use std::sync::Mutex;

    /// Scripted gateway: returns queued verifications in order
    struct ScriptedGateway {
        method: PaymentMethod,
        verifications: Mutex<Vec<GatewayResult<PaymentVerification>>>,
    }

    impl ScriptedGateway {
        fn bkash(verifications: Vec<GatewayResult<PaymentVerification>>) -> Self {
            Self {
                method: PaymentMethod::Bkash,
                verifications: Mutex::new(verifications),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        fn method(&self) -> PaymentMethod {
            self.method
        }

        async fn initiate(
            &self,
            order: &Order,
            _linkage: &CallbackLinkage,
        ) -> GatewayResult<InitiateOutcome> {
            Ok(InitiateOutcome {
                payment_url: format!("https://pay.example.com/{}", order.order_number),
                provider_ref: Some(format!("REF-{}", order.id)),
            })
        }

        async fn verify(&self, _reference: &str) -> GatewayResult<PaymentVerification> {
            self.verifications
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn draft(total_items: &[(f64, i64)]) -> OrderDraft {
        OrderDraft {
            order_number: "ORD-20260101-ENGINE".into(),
            customer_name: "Tania".into(),
            customer_email: None,
            customer_phone: Some("01712345678".into()),
            shipping_address: None,
            shipping_fee: 0.0,
            payment_method: PaymentMethod::Bkash,
            order_source: OrderSource::Checkout,
            note: None,
            items: total_items
                .iter()
                .enumerate()
                .map(|(i, (price, qty))| OrderItemDraft {
                    product_id: i as i64 + 1,
                    name: format!("Item {i}"),
                    unit_price: *price,
                    quantity: *qty,
                })
                .collect(),
        }
    }

    fn completed(amount: f64) -> GatewayResult<PaymentVerification> {
        Ok(PaymentVerification {
            status: VerifiedStatus::Completed,
            amount,
            transaction_id: Some("TRX1".into()),
        })
    }

    async fn engine_with(
        verifications: Vec<GatewayResult<PaymentVerification>>,
    ) -> (ReconciliationEngine, OrderLedger) {
        let db = DbService::memory().await.unwrap();
        let ledger = OrderLedger::new(db.pool);
        let mut registry = GatewayRegistry::new();
        registry.register(Arc::new(ScriptedGateway::bkash(verifications)));
        let engine = ReconciliationEngine::new(
            ledger.clone(),
            Arc::new(registry),
            OrderNotifier::new(),
        );
        (engine, ledger)
    }

    async fn initiated_order(engine: &ReconciliationEngine, ledger: &OrderLedger) -> Order {
        let order = ledger
            .create(&draft(&[(500.0, 2)]), &Actor::system(), None)
            .await
            .unwrap();
        engine.initiate_payment(order.id).await.unwrap();
        ledger.get(order.id).await.unwrap()
    }

    fn linkage_for(order: &Order) -> CallbackLinkage {
        CallbackLinkage {
            v: crate::gateways::LINKAGE_VERSION,
            order_id: order.id,
            nonce: order.payment_nonce.clone().unwrap(),
        }
    }

    #[tokio::test]
    async fn verified_callback_marks_order_paid() {
        let (engine, ledger) = engine_with(vec![completed(1000.0)]).await;
        let order = initiated_order(&engine, &ledger).await;
        assert!(order.payment_ref.is_some());

        let outcome = engine
            .handle_callback("bkash", &linkage_for(&order))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied(PaymentStatus::Paid));

        let fresh = ledger.get(order.id).await.unwrap();
        assert_eq!(fresh.payment_status, PaymentStatus::Paid);
        assert_eq!(fresh.payment_ref.as_deref(), Some("TRX1"));
    }

    #[tokio::test]
    async fn duplicate_callback_is_a_noop_with_no_history_growth() {
        let (engine, ledger) = engine_with(vec![completed(1000.0), completed(1000.0)]).await;
        let order = initiated_order(&engine, &ledger).await;
        let linkage = linkage_for(&order);

        engine.handle_callback("bkash", &linkage).await.unwrap();
        let history_len = ledger.history(order.id).await.unwrap().payment.len();

        let outcome = engine.handle_callback("bkash", &linkage).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::NoOp);
        assert_eq!(
            ledger.history(order.id).await.unwrap().payment.len(),
            history_len
        );
    }

    #[tokio::test]
    async fn nonce_mismatch_is_rejected_without_mutation() {
        let (engine, ledger) = engine_with(vec![completed(1000.0)]).await;
        let order = initiated_order(&engine, &ledger).await;

        let mut linkage = linkage_for(&order);
        linkage.nonce = "forged".into();
        let err = engine.handle_callback("bkash", &linkage).await.unwrap_err();
        assert!(matches!(err, EngineError::LinkageMismatch(_)));
        assert_eq!(
            ledger.get(order.id).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn amount_mismatch_is_rejected_without_mutation() {
        let (engine, ledger) = engine_with(vec![completed(999.0)]).await;
        let order = initiated_order(&engine, &ledger).await;

        let err = engine
            .handle_callback("bkash", &linkage_for(&order))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AmountMismatch { .. }));
        assert_eq!(
            ledger.get(order.id).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn gateway_timeout_leaves_order_untouched() {
        let (engine, ledger) = engine_with(vec![Err(GatewayError::Unreachable(
            "connect timed out".into(),
        ))])
        .await;
        let order = initiated_order(&engine, &ledger).await;

        let err = engine
            .handle_callback("bkash", &linkage_for(&order))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Gateway(GatewayError::Unreachable(_))));
        let fresh = ledger.get(order.id).await.unwrap();
        assert_eq!(fresh.payment_status, PaymentStatus::Pending);
        assert_eq!(
            ledger.history(order.id).await.unwrap().payment.len(),
            1 // creation entry only
        );
    }

    #[tokio::test]
    async fn completed_after_failure_walks_back_through_pending() {
        let (engine, ledger) = engine_with(vec![
            Ok(PaymentVerification {
                status: VerifiedStatus::Failed,
                amount: 1000.0,
                transaction_id: None,
            }),
            completed(1000.0),
        ])
        .await;
        let order = initiated_order(&engine, &ledger).await;
        let linkage = linkage_for(&order);

        let outcome = engine.handle_callback("bkash", &linkage).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied(PaymentStatus::Failed));

        let outcome = engine.handle_callback("bkash", &linkage).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied(PaymentStatus::Paid));

        // FAILED -> PENDING -> PAID, both recorded
        let payment = ledger.history(order.id).await.unwrap().payment;
        let tail: Vec<&str> = payment
            .iter()
            .rev()
            .take(2)
            .map(|e| e.new_value.as_str())
            .collect();
        assert_eq!(tail, vec!["PAID", "PENDING"]);
    }

    #[tokio::test]
    async fn late_failure_after_paid_is_ignored() {
        let (engine, ledger) = engine_with(vec![
            completed(1000.0),
            Ok(PaymentVerification {
                status: VerifiedStatus::Failed,
                amount: 1000.0,
                transaction_id: None,
            }),
        ])
        .await;
        let order = initiated_order(&engine, &ledger).await;
        let linkage = linkage_for(&order);

        engine.handle_callback("bkash", &linkage).await.unwrap();
        let outcome = engine.handle_callback("bkash", &linkage).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Ignored);
        assert_eq!(
            ledger.get(order.id).await.unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn pending_verification_applies_nothing() {
        let (engine, ledger) = engine_with(vec![Ok(PaymentVerification {
            status: VerifiedStatus::Pending,
            amount: 1000.0,
            transaction_id: None,
        })])
        .await;
        let order = initiated_order(&engine, &ledger).await;

        let outcome = engine
            .handle_callback("bkash", &linkage_for(&order))
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::PendingVerification);
        assert_eq!(
            ledger.get(order.id).await.unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn cod_orders_cannot_initiate_hosted_checkout() {
        let (engine, ledger) = engine_with(vec![]).await;
        let mut d = draft(&[(100.0, 1)]);
        d.payment_method = PaymentMethod::CashOnDelivery;
        let order = ledger.create(&d, &Actor::system(), None).await.unwrap();

        assert!(matches!(
            engine.initiate_payment(order.id).await,
            Err(EngineError::Validation(_))
        ));
    }
}
