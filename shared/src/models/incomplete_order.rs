//! Incomplete Order Model
//!
//! Pre-checkout snapshot with its own lifecycle (OPEN → CONVERTED |
//! ABANDONED). Conversion is a one-way copy into a real order, never a
//! status transition of the incomplete record itself.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum IncompleteOrderStatus {
    #[default]
    Open,
    Converted,
    Abandoned,
}

/// Incomplete/abandoned order row. Items are stored as a JSON column —
/// the snapshot is opaque until conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct IncompleteOrder {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    /// JSON array of `IncompleteItem`
    pub items_json: String,
    pub subtotal: f64,
    pub shipping_fee: f64,
    pub total: f64,
    pub status: IncompleteOrderStatus,
    /// Set when converted, links to the resulting order
    pub converted_order_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One captured cart line inside `items_json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncompleteItem {
    pub product_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
}

/// Capture payload for a new incomplete order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncompleteOrderCreate {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub items: Vec<IncompleteItem>,
    pub shipping_fee: f64,
}

impl IncompleteOrder {
    /// Decode the captured items
    pub fn items(&self) -> Result<Vec<IncompleteItem>, serde_json::Error> {
        serde_json::from_str(&self.items_json)
    }
}
