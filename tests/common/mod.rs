// Fixtures compartilhadas pelos testes de integração.
#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use rental_backend::{
    common::error::AppError,
    db::{MemoryRentalStore, RentalStore},
    models::{
        auth::{Principal, Role},
        notification::{Notification, NotificationKind, NotificationMessage},
        product::{NewProduct, Product},
        quotation::{Charges, NewQuotation, Quotation},
        reservation::peak_concurrent,
    },
    services::{
        cart_service::CartService,
        inventory_service::InventoryService,
        lifecycle_service::LifecycleService,
        notification_service::{NotificationService, Notifier},
        order_service::OrderService,
        payment_gateway::{PaymentGateway, PaymentLink, PaymentLinkRequest},
        product_service::ProductService,
        quotation_service::QuotationService,
    },
};

// --- Colaboradores falsos ---

#[derive(Default)]
pub struct FakeGateway {
    failures_left: AtomicUsize,
    pub requests: Mutex<Vec<PaymentLinkRequest>>,
}

impl FakeGateway {
    /// As próximas `n` chamadas falham como um gateway fora do ar.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_link(&self, req: &PaymentLinkRequest) -> Result<PaymentLink, AppError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(req.clone());
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::Gateway("gateway indisponível".into()));
        }
        let n = requests.len();
        Ok(PaymentLink {
            id: format!("plink_{}", n),
            short_url: format!("https://pay.test/{}", n),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<NotificationMessage>>,
}

impl RecordingNotifier {
    pub fn kinds_for(&self, recipient: Uuid) -> Vec<NotificationKind> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.recipient_id == recipient)
            .map(|m| m.kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, msg: &NotificationMessage) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>, AppError> {
        Ok(self
            .sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|m| m.recipient_id == recipient_id)
            .map(Notification::from_message)
            .collect())
    }
}

// --- Montagem ---

pub struct Harness {
    pub store: MemoryRentalStore,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub inventory: InventoryService,
    pub products: ProductService,
    pub quotations: QuotationService,
    pub cart: CartService,
    pub orders: OrderService,
    pub lifecycle: LifecycleService,
    pub notifications: NotificationService,
}

pub fn harness() -> Harness {
    let store = MemoryRentalStore::new();
    let shared: Arc<dyn RentalStore> = Arc::new(store.clone());
    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let timeout = Duration::from_secs(5);

    Harness {
        inventory: InventoryService::new(shared.clone(), timeout),
        products: ProductService::new(shared.clone(), timeout),
        quotations: QuotationService::new(shared.clone(), timeout, notifier.clone()),
        cart: CartService::new(shared.clone(), timeout, notifier.clone()),
        orders: OrderService::new(shared.clone(), timeout),
        lifecycle: LifecycleService::new(shared, timeout, notifier.clone(), gateway.clone()),
        notifications: NotificationService::new(notifier.clone()),
        store,
        gateway,
        notifier,
    }
}

pub fn vendor() -> Principal {
    Principal::new(Uuid::new_v4(), Role::Vendor)
}

pub fn customer() -> Principal {
    Principal::new(Uuid::new_v4(), Role::Customer)
}

/// Instante em janeiro de 2025.
pub fn jan(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

/// "Agora" dos testes: antes de qualquer janela usada.
pub fn before_all() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap()
}

pub fn charges(per_hour: i64, per_day: i64) -> Charges {
    Charges {
        extra_hour_price: Decimal::from(per_hour),
        extra_day_price: Decimal::from(per_day),
        extra_week_price: Decimal::ZERO,
    }
}

impl Harness {
    pub async fn product(&self, owner: &Principal, quantity: i32, daily_rate: i64) -> Product {
        let (product, _) = self
            .products
            .create_product(
                owner,
                NewProduct {
                    owner_id: owner.id,
                    name: "Furadeira".into(),
                    description: None,
                    category_id: None,
                    images: vec![],
                    base_quantity: quantity,
                    daily_rate: Decimal::from(daily_rate),
                },
            )
            .await
            .unwrap();
        product
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn quotation(
        &self,
        owner: &Principal,
        product_id: Uuid,
        customer_id: Option<Uuid>,
        quantity: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        total: i64,
        charges: Charges,
    ) -> Quotation {
        self.quotations
            .create_quotation(
                owner,
                NewQuotation {
                    product_id,
                    customer_id,
                    requested_quantity: quantity,
                    charges,
                    pickup_at: from,
                    return_at: to,
                    pickup_address: None,
                    return_address: None,
                    pricing_breakdown: vec![],
                    total_amount: Decimal::from(total),
                    expires_at: None,
                },
            )
            .await
            .unwrap()
    }

    /// Livro equilibrado e nunca acima do total em nenhum instante.
    pub async fn assert_ledger_sound(&self) {
        let state = self.store.snapshot().await;
        for inv in &state.inventories {
            assert!(inv.is_balanced(), "livro desequilibrado: {:?}", inv);
            assert!(inv.available_quantity >= 0 && inv.reserved_quantity >= 0);
            let holding: Vec<_> = state
                .reservations
                .iter()
                .filter(|r| r.product_id == inv.product_id && r.is_holding())
                .cloned()
                .collect();
            assert!(peak_concurrent(&holding) <= i64::from(inv.total_quantity));
        }
    }
}
