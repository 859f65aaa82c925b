//! Server configuration
//!
//! Defaults suit local development; everything is overridable from the
//! environment (see `.env` support in `main`).

use crate::gateways::{BkashConfig, NagadConfig, SslcommerzConfig};

const DEFAULT_HTTP_PORT: u16 = 8100;
const DEFAULT_DB_PATH: &str = "store.db";
const DEFAULT_ORDER_PREFIX: &str = "ORD";
const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_CATALOG_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub db_path: String,
    /// Externally reachable base URL, used to build webhook callbacks
    pub public_base_url: String,
    pub order_prefix: String,
    pub catalog_url: String,
    pub catalog_timeout_ms: u64,
    pub gateway_timeout_ms: u64,
    pub bkash: Option<BkashConfig>,
    pub nagad: Option<NagadConfig>,
    pub sslcommerz: Option<SslcommerzConfig>,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let public_base_url =
            env_var("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:8100".to_owned());
        let gateway_timeout_ms = env_parse("GATEWAY_TIMEOUT_MS", DEFAULT_GATEWAY_TIMEOUT_MS);

        // A provider is enabled by supplying its credentials
        let bkash = match (
            env_var("BKASH_BASE_URL"),
            env_var("BKASH_APP_KEY"),
            env_var("BKASH_APP_SECRET"),
            env_var("BKASH_USERNAME"),
            env_var("BKASH_PASSWORD"),
        ) {
            (Some(base_url), Some(app_key), Some(app_secret), Some(username), Some(password)) => {
                Some(BkashConfig {
                    base_url,
                    app_key,
                    app_secret,
                    username,
                    password,
                    public_base_url: public_base_url.clone(),
                    timeout_ms: gateway_timeout_ms,
                })
            }
            _ => None,
        };
        let nagad = match (
            env_var("NAGAD_BASE_URL"),
            env_var("NAGAD_MERCHANT_ID"),
            env_var("NAGAD_MERCHANT_KEY"),
        ) {
            (Some(base_url), Some(merchant_id), Some(merchant_key)) => Some(NagadConfig {
                base_url,
                merchant_id,
                merchant_key,
                public_base_url: public_base_url.clone(),
                timeout_ms: gateway_timeout_ms,
            }),
            _ => None,
        };
        let sslcommerz = match (
            env_var("SSLCOMMERZ_BASE_URL"),
            env_var("SSLCOMMERZ_STORE_ID"),
            env_var("SSLCOMMERZ_STORE_PASSWD"),
        ) {
            (Some(base_url), Some(store_id), Some(store_passwd)) => Some(SslcommerzConfig {
                base_url,
                store_id,
                store_passwd,
                public_base_url: public_base_url.clone(),
                timeout_ms: gateway_timeout_ms,
            }),
            _ => None,
        };

        Self {
            http_port: env_parse("HTTP_PORT", DEFAULT_HTTP_PORT),
            db_path: env_var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_owned()),
            public_base_url,
            order_prefix: env_var("ORDER_PREFIX").unwrap_or_else(|| DEFAULT_ORDER_PREFIX.to_owned()),
            catalog_url: env_var("CATALOG_URL")
                .unwrap_or_else(|| "http://localhost:8200".to_owned()),
            catalog_timeout_ms: env_parse("CATALOG_TIMEOUT_MS", DEFAULT_CATALOG_TIMEOUT_MS),
            gateway_timeout_ms,
            bkash,
            nagad,
            sslcommerz,
            log_level: env_var("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            log_dir: env_var("LOG_DIR"),
        }
    }
}
