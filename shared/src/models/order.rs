//! Order Model
//!
//! The order row is a projection of the latest history entries; the
//! history tables are the audit trail. Item price/name are snapshotted
//! at creation time and never re-read from the live catalog.

use crate::order::{OrderStatus, PaymentStatus};
use serde::{Deserialize, Serialize};

/// Payment method — selects the gateway adapter at settlement time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentMethod {
    /// Settled on delivery, no gateway involved
    #[default]
    CashOnDelivery,
    Bkash,
    Nagad,
    Sslcommerz,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "CASH_ON_DELIVERY",
            PaymentMethod::Bkash => "BKASH",
            PaymentMethod::Nagad => "NAGAD",
            PaymentMethod::Sslcommerz => "SSLCOMMERZ",
        }
    }

    /// Providers with a hosted checkout page (COD is settled offline)
    pub fn is_hosted(&self) -> bool {
        !matches!(self, PaymentMethod::CashOnDelivery)
    }
}

/// Order provenance, for audit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderSource {
    #[default]
    Checkout,
    Admin,
    Converted,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Human-readable order number, unique and immutable
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub subtotal: f64,
    pub shipping_fee: f64,
    /// Invariant: total == subtotal + shipping_fee, recomputed on every
    /// item or fee change
    pub total: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub order_source: OrderSource,
    /// Provider-side payment/transaction reference, set once known
    pub payment_ref: Option<String>,
    /// Nonce embedded in the callback linkage at initiate time
    pub payment_nonce: Option<String>,
    pub note: Option<String>,
    /// Optimistic concurrency counter, bumped on every status write
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order item — price identity immutable once persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    /// Product name snapshot at order time
    pub name: String,
    /// Unit price snapshot at order time
    pub unit_price: f64,
    pub quantity: i64,
    pub created_at: i64,
}

/// Order with items (detail view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Item draft for order creation (already price-snapshotted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemDraft {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
}

/// Draft for a new order, built by the composer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_fee: f64,
    pub payment_method: PaymentMethod,
    pub order_source: OrderSource,
    pub note: Option<String>,
    pub items: Vec<OrderItemDraft>,
}

/// Customer identity attributes available at checkout time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Cart line as submitted by the storefront — quantity only, prices are
/// snapshotted server-side from the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub quantity: i64,
}
