//! Full order lifecycle: checkout, provider callback, refund

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::models::{CartLine, CustomerInfo, Order, PaymentMethod};
use shared::order::{OrderStatus, PaymentStatus};

use store_server::db::DbService;
use store_server::gateways::{
    CallbackLinkage, GatewayError, GatewayRegistry, GatewayResult, InitiateOutcome,
    PaymentGateway, PaymentVerification, VerifiedStatus, LINKAGE_VERSION,
};
use store_server::orders::engine::CallbackOutcome;
use store_server::orders::{
    Actor, BlockingGate, OrderComposer, OrderLedger, OrderNotifier, ReconciliationEngine,
    RefundWorkflow,
};
use store_server::services::{CatalogError, CatalogLookup, ProductQuote};

struct FixedCatalog {
    products: HashMap<i64, ProductQuote>,
}

#[async_trait]
impl CatalogLookup for FixedCatalog {
    async fn quote(&self, product_id: i64) -> Result<ProductQuote, CatalogError> {
        self.products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::UnknownProduct(product_id))
    }
}

/// Gateway whose verify answer is set by the test. `failing_initiates`
/// makes the next N initiate calls time out.
struct StubGateway {
    verification: Mutex<PaymentVerification>,
    failing_initiates: Mutex<u32>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Bkash
    }

    async fn initiate(
        &self,
        order: &Order,
        _linkage: &CallbackLinkage,
    ) -> GatewayResult<InitiateOutcome> {
        {
            let mut failing = self.failing_initiates.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(GatewayError::Unreachable("connect timed out".into()));
            }
        }
        Ok(InitiateOutcome {
            payment_url: format!("https://pay.example.com/checkout/{}", order.order_number),
            provider_ref: Some(format!("SESSION-{}", order.id)),
        })
    }

    async fn verify(&self, _reference: &str) -> GatewayResult<PaymentVerification> {
        Ok(self.verification.lock().unwrap().clone())
    }
}

struct Fixture {
    ledger: OrderLedger,
    composer: OrderComposer,
    engine: ReconciliationEngine,
    refunds: RefundWorkflow,
    gateway: Arc<StubGateway>,
}

async fn fixture() -> Fixture {
    let db = DbService::memory().await.unwrap();
    let ledger = OrderLedger::new(db.pool.clone());
    let gate = BlockingGate::new(db.pool);
    let notifier = OrderNotifier::new();

    let gateway = Arc::new(StubGateway {
        verification: Mutex::new(PaymentVerification {
            status: VerifiedStatus::Pending,
            amount: 0.0,
            transaction_id: None,
        }),
        failing_initiates: Mutex::new(0),
    });
    let mut registry = GatewayRegistry::new();
    registry.register(gateway.clone());

    let catalog = FixedCatalog {
        products: HashMap::from([
            (
                1,
                ProductQuote {
                    product_id: 1,
                    name: "Scented Candle".to_owned(),
                    unit_price: 470.0,
                },
            ),
            (
                2,
                ProductQuote {
                    product_id: 2,
                    name: "Gift Wrap".to_owned(),
                    unit_price: 60.0,
                },
            ),
        ]),
    };

    let engine = ReconciliationEngine::new(ledger.clone(), Arc::new(registry), notifier.clone());
    let refunds = RefundWorkflow::new(ledger.clone());
    let composer = OrderComposer::new(
        gate,
        Arc::new(catalog),
        ledger.clone(),
        notifier,
        "ORD",
    );

    Fixture {
        ledger,
        composer,
        engine,
        refunds,
        gateway,
    }
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Asha Rahman".into(),
        email: Some("asha@example.com".into()),
        phone: Some("01712345678".into()),
        shipping_address: Some("12 Green Road, Dhaka".into()),
        device_id: None,
        ip_address: None,
    }
}

fn linkage_for(order: &Order) -> CallbackLinkage {
    CallbackLinkage {
        v: LINKAGE_VERSION,
        order_id: order.id,
        nonce: order.payment_nonce.clone().expect("initiated order has a nonce"),
    }
}

#[tokio::test]
async fn checkout_payment_and_refund_lifecycle() {
    let fx = fixture().await;

    // Checkout: 2x470 + 60 shipping = 1000
    let order = fx
        .composer
        .create_from_cart(
            &customer(),
            &[CartLine { product_id: 1, quantity: 2 }],
            PaymentMethod::Bkash,
            60.0,
            None,
        )
        .await
        .unwrap();
    assert_eq!(order.total, 1000.0);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    let initiation = fx.engine.initiate_payment(order.id).await.unwrap();
    assert!(initiation.payment_url.contains(&order.order_number));

    let order = fx.ledger.get(order.id).await.unwrap();
    assert!(order.payment_nonce.is_some());
    assert_eq!(order.payment_ref.as_deref(), Some(format!("SESSION-{}", order.id).as_str()));

    // Provider reports COMPLETED for the right amount
    *fx.gateway.verification.lock().unwrap() = PaymentVerification {
        status: VerifiedStatus::Completed,
        amount: 1000.0,
        transaction_id: Some("TRX-777".into()),
    };
    let outcome = fx
        .engine
        .handle_callback("bkash", &linkage_for(&order))
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::Applied(PaymentStatus::Paid));

    let paid = fx.ledger.get(order.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payment_ref.as_deref(), Some("TRX-777"));
    // The webhook never touches fulfillment
    assert_eq!(paid.status, OrderStatus::Pending);
    // Webhook transitions carry no operator
    let history = fx.ledger.history(order.id).await.unwrap();
    let paid_entry = history.payment.last().unwrap();
    assert_eq!(paid_entry.new_value, "PAID");
    assert_eq!(paid_entry.operator_id, None);

    // Refund in full
    let refunded = fx
        .refunds
        .refund(order.id, 1000.0, "customer request", &Actor::admin(1, "Rina"))
        .await
        .unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

    // PENDING (creation), PAID, REFUNDED
    let history = fx.ledger.history(order.id).await.unwrap();
    let values: Vec<&str> = history
        .payment
        .iter()
        .map(|e| e.new_value.as_str())
        .collect();
    assert_eq!(values, vec!["PENDING", "PAID", "REFUNDED"]);
}

#[tokio::test]
async fn duplicate_webhook_is_idempotent() {
    let fx = fixture().await;
    let order = fx
        .composer
        .create_from_cart(
            &customer(),
            &[CartLine { product_id: 2, quantity: 5 }],
            PaymentMethod::Bkash,
            0.0,
            None,
        )
        .await
        .unwrap();
    fx.engine.initiate_payment(order.id).await.unwrap();
    let order = fx.ledger.get(order.id).await.unwrap();

    *fx.gateway.verification.lock().unwrap() = PaymentVerification {
        status: VerifiedStatus::Completed,
        amount: 300.0,
        transaction_id: Some("TRX-1".into()),
    };
    let linkage = linkage_for(&order);
    let first = fx.engine.handle_callback("bkash", &linkage).await.unwrap();
    assert_eq!(first, CallbackOutcome::Applied(PaymentStatus::Paid));
    let history_len = fx.ledger.history(order.id).await.unwrap().payment.len();

    // Provider retries the same callback
    let second = fx.engine.handle_callback("bkash", &linkage).await.unwrap();
    assert_eq!(second, CallbackOutcome::NoOp);
    assert_eq!(
        fx.ledger.history(order.id).await.unwrap().payment.len(),
        history_len
    );
    assert_eq!(
        fx.ledger.get(order.id).await.unwrap().payment_status,
        PaymentStatus::Paid
    );
}

#[tokio::test]
async fn payment_can_be_reinitiated_after_a_failed_initiate() {
    let fx = fixture().await;
    let order = fx
        .composer
        .create_from_cart(
            &customer(),
            &[CartLine { product_id: 2, quantity: 2 }],
            PaymentMethod::Bkash,
            0.0,
            None,
        )
        .await
        .unwrap();

    // Provider is down at checkout time; the order survives without a
    // session reference
    *fx.gateway.failing_initiates.lock().unwrap() = 1;
    assert!(fx.engine.initiate_payment(order.id).await.is_err());
    let order = fx.ledger.get(order.id).await.unwrap();
    assert!(order.payment_ref.is_none());
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    // Admin re-initiates once the provider is back
    let initiation = fx.engine.initiate_payment(order.id).await.unwrap();
    assert!(initiation.payment_url.contains(&order.order_number));
    let order = fx.ledger.get(order.id).await.unwrap();
    assert_eq!(order.payment_ref.as_deref(), Some(format!("SESSION-{}", order.id).as_str()));

    // And the callback settles it as usual
    *fx.gateway.verification.lock().unwrap() = PaymentVerification {
        status: VerifiedStatus::Completed,
        amount: 120.0,
        transaction_id: Some("TRX-9".into()),
    };
    let outcome = fx
        .engine
        .handle_callback("bkash", &linkage_for(&order))
        .await
        .unwrap();
    assert_eq!(outcome, CallbackOutcome::Applied(PaymentStatus::Paid));
}

#[tokio::test]
async fn fulfillment_and_payment_axes_move_independently() {
    let fx = fixture().await;
    let order = fx
        .composer
        .create_from_cart(
            &customer(),
            &[CartLine { product_id: 1, quantity: 1 }],
            PaymentMethod::CashOnDelivery,
            30.0,
            None,
        )
        .await
        .unwrap();

    // COD ships before any payment happens
    let admin = Actor::admin(1, "Rina");
    let order = fx
        .engine
        .admin_update_status(order.id, OrderStatus::Processing, &admin, None)
        .await
        .unwrap();
    let order = fx
        .engine
        .admin_update_status(order.id, OrderStatus::Shipped, &admin, None)
        .await
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Pending);

    // Paid on delivery
    let order = fx
        .engine
        .admin_update_payment_status(order.id, PaymentStatus::Paid, &admin, Some("cash received"))
        .await
        .unwrap();
    let order = fx
        .engine
        .admin_update_status(order.id, OrderStatus::Delivered, &admin, None)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}
