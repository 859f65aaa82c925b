//! Notification trigger boundary
//!
//! The engine emits an event on order creation and on every fulfillment
//! transition; the notification subsystem (out of scope here) consumes
//! them from a broadcast channel. Delivery is fire-and-forget — whether
//! a message is actually sent is not this crate's concern.

use shared::models::Order;
use shared::order::OrderStatus;
use tokio::sync::broadcast;

const NOTIFY_CHANNEL_CAPACITY: usize = 1024;

/// Event payload handed to the notification subsystem
#[derive(Debug, Clone)]
pub struct OrderNotification {
    pub order_id: i64,
    pub order_number: String,
    /// None for the creation event
    pub old_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
}

/// Broadcast sender for order notifications
#[derive(Clone)]
pub struct OrderNotifier {
    tx: broadcast::Sender<OrderNotification>,
}

impl OrderNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderNotification> {
        self.tx.subscribe()
    }

    pub fn order_created(&self, order: &Order) {
        self.send(OrderNotification {
            order_id: order.id,
            order_number: order.order_number.clone(),
            old_status: None,
            new_status: order.status,
        });
    }

    pub fn status_changed(&self, order: &Order, old_status: OrderStatus) {
        self.send(OrderNotification {
            order_id: order.id,
            order_number: order.order_number.clone(),
            old_status: Some(old_status),
            new_status: order.status,
        });
    }

    fn send(&self, event: OrderNotification) {
        // No receivers is fine; the notification subsystem may be down
        if self.tx.send(event).is_err() {
            tracing::debug!("Order notification dropped: no active receivers");
        }
    }
}

impl Default for OrderNotifier {
    fn default() -> Self {
        Self::new()
    }
}
