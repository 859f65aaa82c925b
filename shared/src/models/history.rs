//! Status History Model
//!
//! Append-only. One row per transition on either axis; the creation row
//! has a null `old_value`. Fulfillment and payment histories live in
//! separate tables because they originate from different trust
//! boundaries, but share this row shape.

use serde::{Deserialize, Serialize};

/// A single status transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    /// Null for the creation entry
    pub old_value: Option<String>,
    pub new_value: String,
    /// Administrator id, or null for system/webhook transitions
    pub operator_id: Option<i64>,
    pub operator_name: Option<String>,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Merged history view for the admin detail page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistory {
    pub fulfillment: Vec<StatusHistoryEntry>,
    pub payment: Vec<StatusHistoryEntry>,
}
