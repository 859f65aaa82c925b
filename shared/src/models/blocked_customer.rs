//! Blocked Customer Model
//!
//! A block matches if ANY of its populated identity fields equals the
//! corresponding field in the query set (OR semantics). Expired blocks
//! are treated as inactive without a cleanup job.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BlockedCustomer {
    pub id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub device_id: Option<String>,
    pub ip_address: Option<String>,
    pub reason: String,
    /// Customer-facing message shown when checkout is refused
    pub message: Option<String>,
    /// Null = permanent block
    pub expires_at: Option<i64>,
    pub is_active: bool,
    pub created_by: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create payload — at least one identity field must be populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedCustomerCreate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub device_id: Option<String>,
    pub ip_address: Option<String>,
    pub reason: String,
    pub message: Option<String>,
    pub expires_at: Option<i64>,
}

impl BlockedCustomerCreate {
    pub fn has_identity(&self) -> bool {
        self.email.is_some()
            || self.phone.is_some()
            || self.device_id.is_some()
            || self.ip_address.is_some()
    }
}

/// Identity attributes consulted by the blocking gate at checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentitySet {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub device_id: Option<String>,
    pub ip_address: Option<String>,
}

/// Gate verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockVerdict {
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BlockVerdict {
    pub fn clear() -> Self {
        Self {
            blocked: false,
            message: None,
        }
    }
}
