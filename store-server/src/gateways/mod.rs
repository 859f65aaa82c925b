//! Payment gateway adapters
//!
//! One adapter per hosted provider behind the [`PaymentGateway`]
//! contract: `initiate` builds the provider checkout session and
//! returns a redirect URL carrying the callback linkage; `verify` is a
//! pure query against the provider and is safe to call repeatedly.
//!
//! A network timeout is never evidence of failure — adapters surface
//! [`GatewayError::Unreachable`] and the engine leaves the order alone.

pub mod bkash;
pub mod nagad;
pub mod sslcommerz;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::{Order, PaymentMethod};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub use bkash::{BkashConfig, BkashGateway};
pub use nagad::{NagadConfig, NagadGateway};
pub use sslcommerz::{SslcommerzConfig, SslcommerzGateway};

/// Current linkage payload version
pub const LINKAGE_VERSION: u8 = 1;

/// Typed, versioned callback payload tying a webhook to an order.
///
/// Embedded in the callback URL at initiate time; the nonce must match
/// the one stored on the order row or the callback is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackLinkage {
    pub v: u8,
    pub order_id: i64,
    pub nonce: String,
}

impl CallbackLinkage {
    pub fn new(order_id: i64) -> Self {
        Self {
            v: LINKAGE_VERSION,
            order_id,
            nonce: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Query-string encoding for the callback URL (no secrets)
    pub fn query_string(&self) -> String {
        format!("v={}&order_id={}&nonce={}", self.v, self.order_id, self.nonce)
    }
}

/// Result of `initiate`
#[derive(Debug, Clone)]
pub struct InitiateOutcome {
    /// Hosted checkout page to redirect the customer to
    pub payment_url: String,
    /// Provider-side payment/session reference, when issued at initiate
    pub provider_ref: Option<String>,
}

/// Provider-verified payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedStatus {
    Completed,
    Failed,
    /// Still in flight at the provider; apply nothing
    Pending,
}

/// Result of `verify` — the only evidence the engine acts on
#[derive(Debug, Clone)]
pub struct PaymentVerification {
    pub status: VerifiedStatus,
    pub amount: f64,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network timeout or connection failure. Not a payment failure.
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    /// Provider returned a response we could not interpret
    #[error("Malformed gateway response: {0}")]
    Malformed(String),

    /// Provider returned an explicit error
    #[error("Gateway error: {0}")]
    Provider(String),

    #[error("No gateway registered for {0:?}")]
    Unsupported(PaymentMethod),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            GatewayError::Unreachable(err.to_string())
        } else if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else {
            GatewayError::Provider(err.to_string())
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Provider contract. Implementations are stateless per call and own
/// their credentials (passed in at construction, never global).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Start a hosted checkout for the order. The callback URL embeds
    /// the linkage, never a credential.
    async fn initiate(
        &self,
        order: &Order,
        linkage: &CallbackLinkage,
    ) -> GatewayResult<InitiateOutcome>;

    /// Query the provider for the authoritative payment state. Pure
    /// query, safe to repeat.
    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification>;
}

/// Adapter registry keyed by payment method
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    adapters: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn PaymentGateway>) {
        self.adapters.insert(adapter.method(), adapter);
    }

    pub fn get(&self, method: PaymentMethod) -> GatewayResult<Arc<dyn PaymentGateway>> {
        self.adapters
            .get(&method)
            .cloned()
            .ok_or(GatewayError::Unsupported(method))
    }
}

/// Build a reqwest client with the bounded verify/initiate timeout
pub(crate) fn http_client(timeout_ms: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .build()
        .unwrap_or_default()
}

/// Webhook callback URL for a provider, linkage in the query string
pub(crate) fn callback_url(public_base_url: &str, provider: &str, linkage: &CallbackLinkage) -> String {
    format!(
        "{}/api/payments/webhook/{}?{}",
        public_base_url.trim_end_matches('/'),
        provider,
        linkage.query_string()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkage_query_string_carries_no_secrets() {
        let linkage = CallbackLinkage::new(42);
        let qs = linkage.query_string();
        assert!(qs.starts_with("v=1&order_id=42&nonce="));
        assert_eq!(linkage.v, LINKAGE_VERSION);
        assert_eq!(linkage.nonce.len(), 32);
    }

    #[test]
    fn callback_url_shape() {
        let linkage = CallbackLinkage::new(7);
        let url = callback_url("https://shop.example.com/", "bkash", &linkage);
        assert!(url.starts_with("https://shop.example.com/api/payments/webhook/bkash?v=1&order_id=7"));
    }

    #[test]
    fn registry_rejects_unregistered_method() {
        let registry = GatewayRegistry::new();
        assert!(matches!(
            registry.get(PaymentMethod::Bkash),
            Err(GatewayError::Unsupported(PaymentMethod::Bkash))
        ));
    }
}
