//! Order Ledger — the single sanctioned mutator of order status
//!
//! `apply_transition` does three things in one transaction: validate the
//! transition against the axis state machine, write the new field value
//! with an optimistic version check, and append a history entry. Partial
//! application (field updated without history, or vice versa) is the
//! bug this module exists to prevent.
//!
//! On a version conflict the later writer retries with a fresh read, up
//! to [`MAX_TRANSITION_RETRIES`] times.

use crate::db::repository::{order as order_repo, RepoError};
use crate::orders::money;
use shared::models::{Order, OrderDetail, OrderDraft, OrderHistory};
use shared::order::{OrderStatus, PaymentStatus, StatusAxis};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;

/// Bounded retries for optimistic-lock conflicts
const MAX_TRANSITION_RETRIES: u32 = 3;

/// Who is driving a transition
#[derive(Debug, Clone, Default)]
pub struct Actor {
    /// Administrator id; None for system/webhook transitions
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Actor {
    /// System/webhook actor (null operator in history)
    pub fn system() -> Self {
        Self::default()
    }

    pub fn admin(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.id.is_some()
    }
}

/// A requested transition on one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionTarget {
    Fulfillment(OrderStatus),
    Payment(PaymentStatus),
}

impl TransitionTarget {
    pub fn axis(&self) -> StatusAxis {
        match self {
            TransitionTarget::Fulfillment(_) => StatusAxis::Fulfillment,
            TransitionTarget::Payment(_) => StatusAxis::Payment,
        }
    }

    pub fn value_str(&self) -> &'static str {
        match self {
            TransitionTarget::Fulfillment(s) => s.as_str(),
            TransitionTarget::Payment(p) => p.as_str(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Order {0} not found")]
    OrderNotFound(i64),

    #[error("Invalid {axis} transition: {from} -> {to}")]
    InvalidTransition {
        axis: &'static str,
        from: &'static str,
        to: &'static str,
    },

    #[error("Concurrent modification of order {0}, retries exhausted")]
    ConcurrentModification(i64),

    #[error("Item {0} not found on order")]
    ItemNotFound(i64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Repo(RepoError::from(err))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// The persisted order record plus its append-only histories
#[derive(Clone)]
pub struct OrderLedger {
    pool: SqlitePool,
}

impl OrderLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create an order with its items and both creation history entries
    pub async fn create(&self, draft: &OrderDraft, actor: &Actor, note: Option<&str>) -> LedgerResult<Order> {
        let now = shared::util::now_millis();
        let mut tx = self.pool.begin().await?;
        let id = Self::create_in_tx(&mut tx, draft, actor, note, now).await?;
        tx.commit().await?;
        tracing::info!(order_id = id, order_number = %draft.order_number, source = ?draft.order_source, "Order created");
        self.get(id).await
    }

    /// Creation inside a caller-owned transaction (used by the composer
    /// to make incomplete-order conversion atomic)
    pub(crate) async fn create_in_tx(
        conn: &mut SqliteConnection,
        draft: &OrderDraft,
        actor: &Actor,
        note: Option<&str>,
        now: i64,
    ) -> LedgerResult<i64> {
        if draft.items.is_empty() {
            return Err(LedgerError::Validation("order has no items".into()));
        }
        for item in &draft.items {
            money::validate_price(item.unit_price).map_err(LedgerError::Validation)?;
            money::validate_quantity(item.quantity).map_err(LedgerError::Validation)?;
        }
        if !draft.shipping_fee.is_finite() || draft.shipping_fee < 0.0 {
            return Err(LedgerError::Validation(format!(
                "shipping fee must be non-negative, got {}",
                draft.shipping_fee
            )));
        }

        let lines: Vec<(f64, i64)> = draft
            .items
            .iter()
            .map(|i| (i.unit_price, i.quantity))
            .collect();
        let (subtotal, total) = money::compute_totals(&lines, draft.shipping_fee);

        let id = order_repo::insert_order(conn, draft, subtotal, total, now).await?;
        order_repo::insert_items(conn, id, &draft.items, now).await?;
        order_repo::insert_fulfillment_history(
            conn,
            id,
            None,
            OrderStatus::Pending.as_str(),
            actor.id,
            actor.name.as_deref(),
            note,
            now,
        )
        .await?;
        order_repo::insert_payment_history(
            conn,
            id,
            None,
            PaymentStatus::Pending.as_str(),
            actor.id,
            actor.name.as_deref(),
            note,
            now,
        )
        .await?;
        Ok(id)
    }

    pub async fn get(&self, order_id: i64) -> LedgerResult<Order> {
        order_repo::find_by_id(&self.pool, order_id)
            .await?
            .ok_or(LedgerError::OrderNotFound(order_id))
    }

    pub async fn get_detail(&self, order_id: i64) -> LedgerResult<OrderDetail> {
        let order = self.get(order_id).await?;
        let items = order_repo::find_items(&self.pool, order_id).await?;
        Ok(OrderDetail { order, items })
    }

    pub async fn history(&self, order_id: i64) -> LedgerResult<OrderHistory> {
        // Existence check keeps 404 semantics for unknown ids
        self.get(order_id).await?;
        let fulfillment = order_repo::fulfillment_history(&self.pool, order_id).await?;
        let payment = order_repo::payment_history(&self.pool, order_id).await?;
        Ok(OrderHistory {
            fulfillment,
            payment,
        })
    }

    /// Apply a validated transition on one axis.
    ///
    /// Atomic unit: state-machine validation, guarded field write,
    /// history append. Retries with a fresh read on version conflict.
    pub async fn apply_transition(
        &self,
        order_id: i64,
        target: TransitionTarget,
        actor: &Actor,
        note: Option<&str>,
    ) -> LedgerResult<Order> {
        for attempt in 0..MAX_TRANSITION_RETRIES {
            let now = shared::util::now_millis();
            let mut tx = self.pool.begin().await?;

            let order = order_repo::find_by_id_conn(&mut tx, order_id)
                .await?
                .ok_or(LedgerError::OrderNotFound(order_id))?;

            let (old_value, rows) = match target {
                TransitionTarget::Fulfillment(new_status) => {
                    if !order.status.can_transition_to(new_status) {
                        return Err(LedgerError::InvalidTransition {
                            axis: StatusAxis::Fulfillment.as_str(),
                            from: order.status.as_str(),
                            to: new_status.as_str(),
                        });
                    }
                    let rows = order_repo::update_status_guarded(
                        &mut tx,
                        order_id,
                        new_status,
                        order.version,
                        now,
                    )
                    .await?;
                    (order.status.as_str(), rows)
                }
                TransitionTarget::Payment(new_status) => {
                    if !order.payment_status.can_transition_to(new_status) {
                        return Err(LedgerError::InvalidTransition {
                            axis: StatusAxis::Payment.as_str(),
                            from: order.payment_status.as_str(),
                            to: new_status.as_str(),
                        });
                    }
                    let rows = order_repo::update_payment_status_guarded(
                        &mut tx,
                        order_id,
                        new_status,
                        order.version,
                        now,
                    )
                    .await?;
                    (order.payment_status.as_str(), rows)
                }
            };

            if rows == 0 {
                // Someone advanced the version under us; drop the
                // transaction and retry from a fresh read.
                drop(tx);
                tracing::debug!(
                    order_id,
                    attempt,
                    "Transition hit a stale version, retrying"
                );
                continue;
            }

            match target.axis() {
                StatusAxis::Fulfillment => {
                    order_repo::insert_fulfillment_history(
                        &mut tx,
                        order_id,
                        Some(old_value),
                        target.value_str(),
                        actor.id,
                        actor.name.as_deref(),
                        note,
                        now,
                    )
                    .await?;
                }
                StatusAxis::Payment => {
                    order_repo::insert_payment_history(
                        &mut tx,
                        order_id,
                        Some(old_value),
                        target.value_str(),
                        actor.id,
                        actor.name.as_deref(),
                        note,
                        now,
                    )
                    .await?;
                }
            }

            tx.commit().await?;
            tracing::info!(
                order_id,
                axis = target.axis().as_str(),
                from = old_value,
                to = target.value_str(),
                operator_id = ?actor.id,
                "Transition applied"
            );
            return self.get(order_id).await;
        }

        Err(LedgerError::ConcurrentModification(order_id))
    }

    /// Correct an item quantity before shipment, recomputing totals
    /// atomically with the item change
    pub async fn update_item_quantity(
        &self,
        order_id: i64,
        item_id: i64,
        quantity: i64,
    ) -> LedgerResult<OrderDetail> {
        money::validate_quantity(quantity).map_err(LedgerError::Validation)?;

        for _attempt in 0..MAX_TRANSITION_RETRIES {
            let now = shared::util::now_millis();
            let mut tx = self.pool.begin().await?;

            let order = order_repo::find_by_id_conn(&mut tx, order_id)
                .await?
                .ok_or(LedgerError::OrderNotFound(order_id))?;

            if !order.status.allows_item_correction() {
                return Err(LedgerError::Validation(format!(
                    "items cannot be corrected once the order is {}",
                    order.status.as_str()
                )));
            }

            let rows = order_repo::update_item_quantity(&mut tx, order_id, item_id, quantity).await?;
            if rows == 0 {
                return Err(LedgerError::ItemNotFound(item_id));
            }

            let items = order_repo::find_items_conn(&mut tx, order_id).await?;
            let lines: Vec<(f64, i64)> =
                items.iter().map(|i| (i.unit_price, i.quantity)).collect();
            let (subtotal, total) = money::compute_totals(&lines, order.shipping_fee);

            let rows = order_repo::update_totals_guarded(
                &mut tx,
                order_id,
                subtotal,
                total,
                order.version,
                now,
            )
            .await?;
            if rows == 0 {
                drop(tx);
                continue;
            }

            tx.commit().await?;
            return self.get_detail(order_id).await;
        }

        Err(LedgerError::ConcurrentModification(order_id))
    }

    /// Record the callback linkage nonce at payment initiation
    pub async fn record_payment_initiation(
        &self,
        order_id: i64,
        nonce: &str,
        provider_ref: Option<&str>,
    ) -> LedgerResult<()> {
        let now = shared::util::now_millis();
        order_repo::set_payment_initiation(&self.pool, order_id, nonce, provider_ref, now).await?;
        Ok(())
    }

    /// Record the provider transaction id after verification
    pub async fn record_payment_ref(&self, order_id: i64, payment_ref: &str) -> LedgerResult<()> {
        let now = shared::util::now_millis();
        let mut conn = self.pool.acquire().await?;
        order_repo::set_payment_ref(&mut conn, order_id, payment_ref, now).await?;
        Ok(())
    }

    pub async fn list(&self, limit: i64, offset: i64) -> LedgerResult<Vec<Order>> {
        Ok(order_repo::list(&self.pool, limit, offset).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::models::{OrderDraft, OrderItemDraft, OrderSource, PaymentMethod};

    async fn ledger() -> OrderLedger {
        let db = DbService::memory().await.expect("memory db");
        OrderLedger::new(db.pool)
    }

    fn draft(total_items: &[(f64, i64)]) -> OrderDraft {
        OrderDraft {
            order_number: shared::order::order_number("ORD"),
            customer_name: "Test Customer".into(),
            customer_email: Some("test@example.com".into()),
            customer_phone: None,
            shipping_address: None,
            shipping_fee: 0.0,
            payment_method: PaymentMethod::CashOnDelivery,
            order_source: OrderSource::Checkout,
            note: None,
            items: total_items
                .iter()
                .enumerate()
                .map(|(i, (price, qty))| OrderItemDraft {
                    product_id: i as i64 + 1,
                    name: format!("Product {}", i + 1),
                    unit_price: *price,
                    quantity: *qty,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_writes_both_creation_history_entries() {
        let ledger = ledger().await;
        let order = ledger
            .create(&draft(&[(100.0, 2)]), &Actor::system(), None)
            .await
            .unwrap();
        assert_eq!(order.status, shared::order::OrderStatus::Pending);
        assert_eq!(order.payment_status, shared::order::PaymentStatus::Pending);
        assert_eq!(order.subtotal, 200.0);
        assert_eq!(order.total, 200.0);

        let history = ledger.history(order.id).await.unwrap();
        assert_eq!(history.fulfillment.len(), 1);
        assert_eq!(history.payment.len(), 1);
        assert_eq!(history.fulfillment[0].old_value, None);
        assert_eq!(history.fulfillment[0].new_value, "PENDING");
        assert_eq!(history.payment[0].operator_id, None);
    }

    #[tokio::test]
    async fn transition_writes_field_and_history_together() {
        let ledger = ledger().await;
        let order = ledger
            .create(&draft(&[(50.0, 1)]), &Actor::system(), None)
            .await
            .unwrap();

        let updated = ledger
            .apply_transition(
                order.id,
                TransitionTarget::Fulfillment(shared::order::OrderStatus::Processing),
                &Actor::admin(7, "alice"),
                Some("picking started"),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, shared::order::OrderStatus::Processing);
        assert_eq!(updated.version, order.version + 1);

        let history = ledger.history(order.id).await.unwrap();
        assert_eq!(history.fulfillment.len(), 2);
        let last = history.fulfillment.last().unwrap();
        assert_eq!(last.old_value.as_deref(), Some("PENDING"));
        assert_eq!(last.new_value, "PROCESSING");
        assert_eq!(last.operator_id, Some(7));
        assert_eq!(last.note.as_deref(), Some("picking started"));
    }

    #[tokio::test]
    async fn invalid_transition_leaves_order_and_history_untouched() {
        let ledger = ledger().await;
        let order = ledger
            .create(&draft(&[(50.0, 1)]), &Actor::system(), None)
            .await
            .unwrap();
        ledger
            .apply_transition(
                order.id,
                TransitionTarget::Payment(shared::order::PaymentStatus::Paid),
                &Actor::system(),
                Some("paid"),
            )
            .await
            .unwrap();

        // PAID -> FAILED is forbidden
        let err = ledger
            .apply_transition(
                order.id,
                TransitionTarget::Payment(shared::order::PaymentStatus::Failed),
                &Actor::system(),
                Some("should not apply"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        let after = ledger.get(order.id).await.unwrap();
        assert_eq!(after.payment_status, shared::order::PaymentStatus::Paid);
        let history = ledger.history(order.id).await.unwrap();
        assert_eq!(history.payment.len(), 2); // create + paid only
    }

    #[tokio::test]
    async fn history_fold_reproduces_current_state() {
        let ledger = ledger().await;
        let order = ledger
            .create(&draft(&[(10.0, 1)]), &Actor::system(), None)
            .await
            .unwrap();
        for (target, note) in [
            (
                TransitionTarget::Fulfillment(shared::order::OrderStatus::Processing),
                "processing",
            ),
            (
                TransitionTarget::Fulfillment(shared::order::OrderStatus::Shipped),
                "shipped",
            ),
            (
                TransitionTarget::Fulfillment(shared::order::OrderStatus::Delivered),
                "delivered",
            ),
        ] {
            ledger
                .apply_transition(order.id, target, &Actor::admin(1, "bob"), Some(note))
                .await
                .unwrap();
        }

        let current = ledger.get(order.id).await.unwrap();
        let history = ledger.history(order.id).await.unwrap();
        // Replaying entries in order must land on the projected status
        let folded = history
            .fulfillment
            .iter()
            .fold(None::<String>, |_, e| Some(e.new_value.clone()))
            .unwrap();
        assert_eq!(folded, current.status.as_str());
        assert_eq!(history.fulfillment.len(), 4);
    }

    #[tokio::test]
    async fn quantity_correction_recomputes_totals() {
        let ledger = ledger().await;
        let mut d = draft(&[(25.0, 2)]);
        d.shipping_fee = 5.0;
        let order = ledger.create(&d, &Actor::system(), None).await.unwrap();
        assert_eq!(order.total, 55.0);

        let items = order_repo::find_items(ledger.pool(), order.id).await.unwrap();
        let detail = ledger
            .update_item_quantity(order.id, items[0].id, 3)
            .await
            .unwrap();
        assert_eq!(detail.order.subtotal, 75.0);
        assert_eq!(detail.order.total, 80.0);
        // Invariant: total == subtotal + shipping_fee
        assert!(money::amounts_match(
            detail.order.total,
            detail.order.subtotal + detail.order.shipping_fee
        ));
    }

    #[tokio::test]
    async fn quantity_correction_rejected_after_shipment() {
        let ledger = ledger().await;
        let order = ledger
            .create(&draft(&[(25.0, 2)]), &Actor::system(), None)
            .await
            .unwrap();
        let items = order_repo::find_items(ledger.pool(), order.id).await.unwrap();
        for target in [
            TransitionTarget::Fulfillment(shared::order::OrderStatus::Processing),
            TransitionTarget::Fulfillment(shared::order::OrderStatus::Shipped),
        ] {
            ledger
                .apply_transition(order.id, target, &Actor::admin(1, "bob"), None)
                .await
                .unwrap();
        }
        let err = ledger
            .update_item_quantity(order.id, items[0].id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
