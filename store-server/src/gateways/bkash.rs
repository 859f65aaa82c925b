//! bKash tokenized checkout adapter

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::models::{Order, PaymentMethod};

use super::{
    callback_url, http_client, CallbackLinkage, GatewayError, GatewayResult, InitiateOutcome,
    PaymentGateway, PaymentVerification, VerifiedStatus,
};

#[derive(Debug, Clone)]
pub struct BkashConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub username: String,
    pub password: String,
    pub public_base_url: String,
    pub timeout_ms: u64,
}

pub struct BkashGateway {
    config: BkashConfig,
    client: reqwest::Client,
}

impl BkashGateway {
    pub fn new(config: BkashConfig) -> Self {
        let client = http_client(config.timeout_ms);
        Self { config, client }
    }

    /// Grant a short-lived id token. bKash requires one per session;
    /// TODO: cache the token for its advertised lifetime instead of
    /// granting on every call.
    async fn grant_token(&self) -> GatewayResult<String> {
        let url = format!("{}/tokenized/checkout/token/grant", self.config.base_url);
        let body: Value = self
            .client
            .post(&url)
            .header("username", &self.config.username)
            .header("password", &self.config.password)
            .json(&json!({
                "app_key": self.config.app_key,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await?
            .json()
            .await?;

        body.get("id_token")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::Malformed("missing id_token in grant response".into()))
    }

    fn auth_headers(&self, token: &str) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", token.to_owned()),
            ("X-APP-Key", self.config.app_key.clone()),
        ]
    }
}

#[async_trait]
impl PaymentGateway for BkashGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Bkash
    }

    async fn initiate(
        &self,
        order: &Order,
        linkage: &CallbackLinkage,
    ) -> GatewayResult<InitiateOutcome> {
        let token = self.grant_token().await?;
        let url = format!("{}/tokenized/checkout/create", self.config.base_url);
        let mut req = self.client.post(&url);
        for (name, value) in self.auth_headers(&token) {
            req = req.header(name, value);
        }
        let body: Value = req
            .json(&json!({
                "mode": "0011",
                "payerReference": order.order_number,
                "callbackURL": callback_url(&self.config.public_base_url, "bkash", linkage),
                "amount": format!("{:.2}", order.total),
                "currency": "BDT",
                "intent": "sale",
                "merchantInvoiceNumber": order.order_number,
            }))
            .send()
            .await?
            .json()
            .await?;

        let payment_url = body
            .get("bkashURL")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Malformed("missing bkashURL in create response".into()))?
            .to_owned();
        let provider_ref = body
            .get("paymentID")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(InitiateOutcome {
            payment_url,
            provider_ref,
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification> {
        let token = self.grant_token().await?;
        let url = format!("{}/tokenized/checkout/payment/status", self.config.base_url);
        let mut req = self.client.post(&url);
        for (name, value) in self.auth_headers(&token) {
            req = req.header(name, value);
        }
        let body: Value = req
            .json(&json!({ "paymentID": reference }))
            .send()
            .await?
            .json()
            .await?;

        let status = match body.get("transactionStatus").and_then(Value::as_str) {
            Some("Completed") => VerifiedStatus::Completed,
            Some("Initiated") | Some("Authorized") => VerifiedStatus::Pending,
            Some(_) => VerifiedStatus::Failed,
            None => {
                return Err(GatewayError::Malformed(
                    "missing transactionStatus in status response".into(),
                ))
            }
        };
        let amount = body
            .get("amount")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| GatewayError::Malformed("missing amount in status response".into()))?;
        let transaction_id = body.get("trxID").and_then(Value::as_str).map(str::to_owned);

        Ok(PaymentVerification {
            status,
            amount,
            transaction_id,
        })
    }
}
