//! Shared server state
//!
//! Built once at startup and cloned into every handler. All members are
//! cheap to clone (pools and channels are internally reference-counted).

use std::sync::Arc;

use crate::core::config::Config;
use crate::db::DbService;
use crate::gateways::{BkashGateway, GatewayRegistry, NagadGateway, SslcommerzGateway};
use crate::orders::{
    BlockingGate, OrderComposer, OrderLedger, OrderNotifier, ReconciliationEngine, RefundWorkflow,
};
use crate::services::HttpCatalog;
use crate::utils::AppError;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub db: DbService,
    pub ledger: OrderLedger,
    pub engine: ReconciliationEngine,
    pub composer: Arc<OrderComposer>,
    pub gate: BlockingGate,
    pub refunds: RefundWorkflow,
    pub notifier: OrderNotifier,
}

impl ServerState {
    pub async fn initialize(config: Config) -> Result<Self, AppError> {
        let db = DbService::new(&config.db_path).await?;
        let ledger = OrderLedger::new(db.pool.clone());
        let gate = BlockingGate::new(db.pool.clone());
        let notifier = OrderNotifier::new();

        let mut registry = GatewayRegistry::new();
        if let Some(cfg) = &config.bkash {
            registry.register(Arc::new(BkashGateway::new(cfg.clone())));
        }
        if let Some(cfg) = &config.nagad {
            registry.register(Arc::new(NagadGateway::new(cfg.clone())));
        }
        if let Some(cfg) = &config.sslcommerz {
            registry.register(Arc::new(SslcommerzGateway::new(cfg.clone())));
        }

        let engine = ReconciliationEngine::new(ledger.clone(), Arc::new(registry), notifier.clone());
        let refunds = RefundWorkflow::new(ledger.clone());
        let catalog = Arc::new(HttpCatalog::new(
            config.catalog_url.clone(),
            config.catalog_timeout_ms,
        ));
        let composer = Arc::new(OrderComposer::new(
            gate.clone(),
            catalog,
            ledger.clone(),
            notifier.clone(),
            config.order_prefix.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            ledger,
            engine,
            composer,
            gate,
            refunds,
            notifier,
        })
    }
}
