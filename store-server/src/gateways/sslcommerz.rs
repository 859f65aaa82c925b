//! SSLCommerz hosted checkout adapter

use async_trait::async_trait;
use serde_json::Value;
use shared::models::{Order, PaymentMethod};

use super::{
    callback_url, http_client, CallbackLinkage, GatewayError, GatewayResult, InitiateOutcome,
    PaymentGateway, PaymentVerification, VerifiedStatus,
};

#[derive(Debug, Clone)]
pub struct SslcommerzConfig {
    pub base_url: String,
    pub store_id: String,
    pub store_passwd: String,
    pub public_base_url: String,
    pub timeout_ms: u64,
}

pub struct SslcommerzGateway {
    config: SslcommerzConfig,
    client: reqwest::Client,
}

impl SslcommerzGateway {
    pub fn new(config: SslcommerzConfig) -> Self {
        let client = http_client(config.timeout_ms);
        Self { config, client }
    }
}

#[async_trait]
impl PaymentGateway for SslcommerzGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Sslcommerz
    }

    async fn initiate(
        &self,
        order: &Order,
        linkage: &CallbackLinkage,
    ) -> GatewayResult<InitiateOutcome> {
        let url = format!("{}/gwprocess/v4/api.php", self.config.base_url);
        let cb = callback_url(&self.config.public_base_url, "sslcommerz", linkage);
        // SSLCommerz takes form-encoded session creation
        let form = [
            ("store_id", self.config.store_id.as_str()),
            ("store_passwd", self.config.store_passwd.as_str()),
            ("total_amount", &format!("{:.2}", order.total)),
            ("currency", "BDT"),
            ("tran_id", order.order_number.as_str()),
            ("success_url", cb.as_str()),
            ("fail_url", cb.as_str()),
            ("cancel_url", cb.as_str()),
            ("cus_name", order.customer_name.as_str()),
            (
                "cus_email",
                order.customer_email.as_deref().unwrap_or("none@example.com"),
            ),
            ("cus_phone", order.customer_phone.as_deref().unwrap_or("")),
            ("product_category", "general"),
            ("shipping_method", "NO"),
        ];
        let body: Value = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        match body.get("status").and_then(Value::as_str) {
            Some("SUCCESS") => {}
            Some(other) => {
                let reason = body
                    .get("failedreason")
                    .and_then(Value::as_str)
                    .unwrap_or(other);
                return Err(GatewayError::Provider(reason.to_owned()));
            }
            None => {
                return Err(GatewayError::Malformed(
                    "missing status in session response".into(),
                ))
            }
        }

        let payment_url = body
            .get("GatewayPageURL")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Malformed("missing GatewayPageURL in session response".into()))?
            .to_owned();
        let provider_ref = body
            .get("sessionkey")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(InitiateOutcome {
            payment_url,
            provider_ref,
        })
    }

    async fn verify(&self, reference: &str) -> GatewayResult<PaymentVerification> {
        let url = format!(
            "{}/validator/api/merchantTransIDvalidationAPI.php",
            self.config.base_url
        );
        let body: Value = self
            .client
            .get(&url)
            .query(&[
                ("sessionkey", reference),
                ("store_id", self.config.store_id.as_str()),
                ("store_passwd", self.config.store_passwd.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .json()
            .await?;

        let status = match body.get("status").and_then(Value::as_str) {
            Some("VALID") | Some("VALIDATED") => VerifiedStatus::Completed,
            Some("PENDING") => VerifiedStatus::Pending,
            Some(_) => VerifiedStatus::Failed,
            None => {
                return Err(GatewayError::Malformed(
                    "missing status in validation response".into(),
                ))
            }
        };
        let amount = match body.get("amount") {
            Some(Value::String(s)) => s.parse::<f64>().ok(),
            Some(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
        .ok_or_else(|| GatewayError::Malformed("missing amount in validation response".into()))?;
        let transaction_id = body
            .get("bank_tran_id")
            .and_then(Value::as_str)
            .map(str::to_owned);

        Ok(PaymentVerification {
            status,
            amount,
            transaction_id,
        })
    }
}
