//! Data models
//!
//! Shared between store-server and admin clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake-generated).

pub mod blocked_customer;
pub mod history;
pub mod incomplete_order;
pub mod order;

// Re-exports
pub use blocked_customer::*;
pub use history::*;
pub use incomplete_order::*;
pub use order::*;
