//! Order lifecycle core
//!
//! The ledger owns every status write; the engine validates and drives
//! transitions from webhooks and administrators; the composer builds new
//! orders; refund and blocking are thin, heavily-validated specializations.

pub mod blocking;
pub mod composer;
pub mod engine;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod refund;

pub use blocking::BlockingGate;
pub use composer::OrderComposer;
pub use engine::ReconciliationEngine;
pub use ledger::{Actor, LedgerError, OrderLedger, TransitionTarget};
pub use notify::{OrderNotification, OrderNotifier};
pub use refund::RefundWorkflow;
