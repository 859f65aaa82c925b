//! Nagad checkout adapter

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::models::{Order, PaymentMethod};

use super::{
    callback_url, http_client, CallbackLinkage, GatewayError, GatewayResult, InitiateOutcome,
    PaymentGateway, PaymentVerification, VerifiedStatus,
};

#[derive(Debug, Clone)]
pub struct NagadConfig {
    pub base_url: String,
    pub merchant_id: String,
    pub merchant_key: String,
    pub public_base_url: String,
    pub timeout_ms: u64,
}

pub struct NagadGateway {
    config: NagadConfig,
    client: reqwest::Client,
}

impl NagadGateway {
    pub fn new(config: NagadConfig) -> Self {
        let client = http_client(config.timeout_ms);
        Self { config, client }
    }
}

#[async_trait]
impl PaymentGateway for NagadGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Nagad
    }

    async fn initiate(
        &self,
        order: &Order,
        linkage: &CallbackLinkage,
    ) -> GatewayResult<InitiateOutcome> {
        let url = format!(
            "{}/api/dfs/check-out/initialize/{}/{}",
            self.config.base_url, self.config.merchant_id, order.order_number
        );
        let body: Value = self
            .client
            .post(&url)
            .header("X-KM-Api-Version", "v-0.2.0")
            .header("X-KM-MC-Id", &self.config.merchant_id)
            .header("X-KM-MC-Key", &self.config.merchant_key)
            .json(&json!({
                "amount": format!("{:.2}", order.total),
                "currencyCode": "050",
                "merchantCallbackURL": callback_url(&self.config.public_base_url, "nagad", linkage),
            }))
            .send()
            .await?
            .json()
            .await?;

        let payment_url = body
            .get("callBackUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Malformed("missing callBackUrl in initialize response".into()))?
            .to_owned();
        let provider_ref = body
            .get("paymentReferenceId")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(InitiateOutcome {
            payment_url,
            provider_ref,
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification> {
        let url = format!(
            "{}/api/dfs/verify/payment/{}",
            self.config.base_url, reference
        );
        let body: Value = self
            .client
            .get(&url)
            .header("X-KM-Api-Version", "v-0.2.0")
            .header("X-KM-MC-Id", &self.config.merchant_id)
            .header("X-KM-MC-Key", &self.config.merchant_key)
            .send()
            .await?
            .json()
            .await?;

        let status = match body.get("status").and_then(Value::as_str) {
            Some("Success") => VerifiedStatus::Completed,
            Some("InProgress") | Some("OrderInitiated") => VerifiedStatus::Pending,
            Some(_) => VerifiedStatus::Failed,
            None => {
                return Err(GatewayError::Malformed(
                    "missing status in verify response".into(),
                ))
            }
        };
        let amount = body
            .get("amount")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| GatewayError::Malformed("missing amount in verify response".into()))?;
        let transaction_id = body
            .get("issuerPaymentRefNo")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(PaymentVerification {
            status,
            amount,
            transaction_id,
        })
    }
}
