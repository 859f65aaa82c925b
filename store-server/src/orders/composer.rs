//! Order composer
//!
//! Builds new orders from three entry points: the storefront cart, a
//! manual admin entry, and conversion of a captured incomplete order.
//! All item prices are snapshotted server-side; cart submissions carry
//! quantities only and never a price. The blocking gate is consulted
//! before any storefront order is accepted.

use std::sync::Arc;

use shared::models::{
    CartLine, CustomerInfo, IdentitySet, IncompleteOrder, IncompleteOrderCreate,
    IncompleteOrderStatus, Order, OrderDraft, OrderItemDraft, OrderSource, PaymentMethod,
};
use shared::order::order_number;
use thiserror::Error;
use tracing::info;

use super::blocking::{BlockingError, BlockingGate};
use super::ledger::{Actor, LedgerError, OrderLedger};
use super::money;
use super::notify::OrderNotifier;
use crate::db::repository::{incomplete_order as incomplete_repo, RepoError};
use crate::services::{CatalogError, CatalogLookup};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Customer is blocked")]
    Blocked { message: Option<String> },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Validation(String),

    #[error("Incomplete order not found: {0}")]
    IncompleteNotFound(i64),

    #[error("Incomplete order {0} is no longer open")]
    NotOpen(i64),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Blocking(#[from] BlockingError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

fn strip_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn identity_of(customer: &CustomerInfo) -> IdentitySet {
    IdentitySet {
        email: strip_empty(customer.email.clone()),
        phone: strip_empty(customer.phone.clone()),
        device_id: strip_empty(customer.device_id.clone()),
        ip_address: strip_empty(customer.ip_address.clone()),
    }
}

pub struct OrderComposer {
    gate: BlockingGate,
    catalog: Arc<dyn CatalogLookup>,
    ledger: OrderLedger,
    notifier: OrderNotifier,
    order_prefix: String,
}

impl OrderComposer {
    pub fn new(
        gate: BlockingGate,
        catalog: Arc<dyn CatalogLookup>,
        ledger: OrderLedger,
        notifier: OrderNotifier,
        order_prefix: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            catalog,
            ledger,
            notifier,
            order_prefix: order_prefix.into(),
        }
    }

    /// Storefront checkout. Prices come from the catalog, never the
    /// client; the blocking gate runs before anything is persisted.
    pub async fn create_from_cart(
        &self,
        customer: &CustomerInfo,
        cart: &[CartLine],
        payment_method: PaymentMethod,
        shipping_fee: f64,
        note: Option<&str>,
    ) -> Result<Order, ComposeError> {
        if customer.name.trim().is_empty() {
            return Err(ComposeError::Validation("customer name is required".into()));
        }
        if cart.is_empty() {
            return Err(ComposeError::EmptyCart);
        }

        let verdict = self.gate.check(&identity_of(customer)).await?;
        if verdict.blocked {
            return Err(ComposeError::Blocked {
                message: verdict.message,
            });
        }

        let mut items = Vec::with_capacity(cart.len());
        for line in cart {
            if line.quantity <= 0 {
                return Err(ComposeError::Validation(format!(
                    "invalid quantity for product {}",
                    line.product_id
                )));
            }
            let quote = self.catalog.quote(line.product_id).await?;
            items.push(OrderItemDraft {
                product_id: quote.product_id,
                name: quote.name,
                unit_price: quote.unit_price,
                quantity: line.quantity,
            });
        }

        let draft = self.draft_for(customer, items, payment_method, shipping_fee, note, OrderSource::Checkout);
        let order = self.ledger.create(&draft, &Actor::system(), None).await?;
        self.notifier.order_created(&order);
        Ok(order)
    }

    /// Manual admin entry (phone orders). Prices are supplied by the
    /// operator and the blocking gate is not consulted.
    pub async fn create_manual(
        &self,
        customer: &CustomerInfo,
        items: Vec<OrderItemDraft>,
        payment_method: PaymentMethod,
        shipping_fee: f64,
        note: Option<&str>,
        actor: &Actor,
    ) -> Result<Order, ComposeError> {
        if !actor.is_admin() {
            return Err(ComposeError::Validation(
                "an operator is required for manual orders".into(),
            ));
        }
        if customer.name.trim().is_empty() {
            return Err(ComposeError::Validation("customer name is required".into()));
        }

        let draft = self.draft_for(customer, items, payment_method, shipping_fee, note, OrderSource::Admin);
        let order = self.ledger.create(&draft, actor, note).await?;
        self.notifier.order_created(&order);
        Ok(order)
    }

    /// Capture an abandoned checkout for later follow-up
    pub async fn record_incomplete(
        &self,
        create: IncompleteOrderCreate,
    ) -> Result<IncompleteOrder, ComposeError> {
        if create.customer_name.trim().is_empty() {
            return Err(ComposeError::Validation("customer name is required".into()));
        }
        if create.items.is_empty() {
            return Err(ComposeError::EmptyCart);
        }
        let lines: Vec<(f64, i64)> = create
            .items
            .iter()
            .map(|i| (i.unit_price, i.quantity))
            .collect();
        let (subtotal, total) = money::compute_totals(&lines, create.shipping_fee);
        let items_json = serde_json::to_string(&create.items)
            .map_err(|e| ComposeError::Validation(format!("unencodable items: {e}")))?;

        let record = incomplete_repo::create(
            self.ledger.pool(),
            &create.customer_name,
            create.customer_email.as_deref(),
            create.customer_phone.as_deref(),
            create.shipping_address.as_deref(),
            &items_json,
            subtotal,
            create.shipping_fee,
            total,
        )
        .await?;
        info!(incomplete_id = record.id, "Incomplete order captured");
        Ok(record)
    }

    /// Convert a captured incomplete order into a real order.
    ///
    /// Creation and the OPEN -> CONVERTED flip happen in one
    /// transaction; a concurrent conversion loses the guarded update and
    /// the whole attempt rolls back, so the same capture can never
    /// produce two orders.
    pub async fn convert_from_incomplete(
        &self,
        incomplete_id: i64,
        payment_method: PaymentMethod,
        actor: &Actor,
    ) -> Result<Order, ComposeError> {
        if !actor.is_admin() {
            return Err(ComposeError::Validation(
                "an operator is required for conversion".into(),
            ));
        }

        let record = incomplete_repo::find_by_id(self.ledger.pool(), incomplete_id)
            .await?
            .ok_or(ComposeError::IncompleteNotFound(incomplete_id))?;
        if record.status != IncompleteOrderStatus::Open {
            return Err(ComposeError::NotOpen(incomplete_id));
        }
        let items: Vec<OrderItemDraft> = record
            .items()
            .map_err(|e| ComposeError::Validation(format!("corrupt captured items: {e}")))?
            .into_iter()
            .map(|i| OrderItemDraft {
                product_id: i.product_id,
                name: i.name,
                unit_price: i.unit_price,
                quantity: i.quantity,
            })
            .collect();

        let draft = OrderDraft {
            order_number: order_number(&self.order_prefix),
            customer_name: record.customer_name.clone(),
            customer_email: record.customer_email.clone(),
            customer_phone: record.customer_phone.clone(),
            shipping_address: record.shipping_address.clone(),
            shipping_fee: record.shipping_fee,
            payment_method,
            order_source: OrderSource::Converted,
            note: None,
            items,
        };

        let now = shared::util::now_millis();
        let conversion_note = format!("Converted from incomplete order {incomplete_id}");
        let mut tx = self.ledger.pool().begin().await.map_err(LedgerError::from)?;
        let order_id =
            OrderLedger::create_in_tx(&mut tx, &draft, actor, Some(&conversion_note), now).await?;
        let rows = incomplete_repo::mark_converted(&mut tx, incomplete_id, order_id, now).await?;
        if rows == 0 {
            // Lost the race to another conversion
            tx.rollback().await.map_err(LedgerError::from)?;
            return Err(ComposeError::NotOpen(incomplete_id));
        }
        tx.commit().await.map_err(LedgerError::from)?;

        let order = self.ledger.get(order_id).await?;
        info!(
            incomplete_id,
            order_id,
            order_number = %order.order_number,
            "Incomplete order converted"
        );
        self.notifier.order_created(&order);
        Ok(order)
    }

    pub async fn abandon_incomplete(&self, incomplete_id: i64) -> Result<(), ComposeError> {
        if !incomplete_repo::mark_abandoned(self.ledger.pool(), incomplete_id).await? {
            // Either missing or already closed
            let record = incomplete_repo::find_by_id(self.ledger.pool(), incomplete_id)
                .await?
                .ok_or(ComposeError::IncompleteNotFound(incomplete_id))?;
            return Err(ComposeError::NotOpen(record.id));
        }
        Ok(())
    }

    pub async fn list_incomplete(
        &self,
        status: Option<IncompleteOrderStatus>,
    ) -> Result<Vec<IncompleteOrder>, ComposeError> {
        Ok(incomplete_repo::list(self.ledger.pool(), status).await?)
    }

    pub async fn get_incomplete(&self, incomplete_id: i64) -> Result<IncompleteOrder, ComposeError> {
        incomplete_repo::find_by_id(self.ledger.pool(), incomplete_id)
            .await?
            .ok_or(ComposeError::IncompleteNotFound(incomplete_id))
    }

    fn draft_for(
        &self,
        customer: &CustomerInfo,
        items: Vec<OrderItemDraft>,
        payment_method: PaymentMethod,
        shipping_fee: f64,
        note: Option<&str>,
        source: OrderSource,
    ) -> OrderDraft {
        OrderDraft {
            order_number: order_number(&self.order_prefix),
            customer_name: customer.name.trim().to_owned(),
            customer_email: strip_empty(customer.email.clone()),
            customer_phone: strip_empty(customer.phone.clone()),
            shipping_address: strip_empty(customer.shipping_address.clone()),
            shipping_fee,
            payment_method,
            order_source: source,
            note: note.map(str::to_owned),
            items,
        }
    }
}
