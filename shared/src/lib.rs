//! Shared types for the store backend
//!
//! Data models, status state machines and utility types used by the
//! server and by API consumers. DB row types gate their sqlx derives
//! behind the `db` feature.

pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
