//! Store server
//!
//! Order and payment lifecycle backend for a small e-commerce merchant:
//! an append-only order ledger with independent fulfillment and payment
//! status axes, provider-verified payment reconciliation, refunds,
//! incomplete-order capture/conversion, and a customer blocking gate.

pub mod api;
pub mod core;
pub mod db;
pub mod gateways;
pub mod orders;
pub mod services;
pub mod utils;
