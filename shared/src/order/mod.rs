//! Order lifecycle types
//!
//! The two status axes (fulfillment and payment) and the order
//! numbering scheme. The status machines here are the single source of
//! truth for which transitions the ledger will accept.

pub mod number;
pub mod status;

// Re-exports
pub use number::order_number;
pub use status::{OrderStatus, PaymentStatus, StatusAxis};
