// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{MemoryRentalStore, PgRentalStore, RentalStore},
    services::{
        auth::AuthService,
        cart_service::CartService,
        inventory_service::InventoryService,
        lifecycle_service::LifecycleService,
        notification_service::{MemoryNotifier, NotificationService, Notifier, PgNotifier},
        order_service::OrderService,
        payment_gateway::{GatewayConfig, HttpPaymentGateway, PaymentGateway},
        product_service::ProductService,
        quotation_service::QuotationService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub storage: StorageBackend,
    pub max_connections: u32,
    pub tx_timeout: Duration,
    // Metade do prazo da transação: quem espera lock desiste antes do timeout geral
    pub lock_timeout: Duration,
    pub gateway: GatewayConfig,
    pub webhook_secret: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} deve ser definida", key))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{} inválida: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let storage = match optional("STORAGE_BACKEND", "postgres").as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => anyhow::bail!("STORAGE_BACKEND desconhecido: '{}' (use postgres ou memory)", other),
        };
        let database_url = match storage {
            StorageBackend::Postgres => Some(required("DATABASE_URL")?),
            StorageBackend::Memory => env::var("DATABASE_URL").ok(),
        };
        let tx_timeout = Duration::from_millis(parsed("TX_TIMEOUT_MS", 5000u64)?);

        Ok(Self {
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000"),
            storage,
            max_connections: parsed("DB_MAX_CONNECTIONS", 5u32)?,
            tx_timeout,
            lock_timeout: tx_timeout / 2,
            gateway: GatewayConfig {
                base_url: required("PAYMENT_GATEWAY_URL")?,
                key_id: required("PAYMENT_KEY_ID")?,
                key_secret: required("PAYMENT_KEY_SECRET")?,
                currency: optional("PAYMENT_CURRENCY", "INR"),
                callback_url: env::var("PAYMENT_CALLBACK_URL").ok(),
                timeout: Duration::from_millis(parsed("PAYMENT_TIMEOUT_MS", 10_000u64)?),
            },
            webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: Option<PgPool>,
    pub auth_service: AuthService,
    pub inventory_service: InventoryService,
    pub product_service: ProductService,
    pub quotation_service: QuotationService,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub lifecycle_service: LifecycleService,
    pub notification_service: NotificationService,
    pub webhook_secret: String,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(
            HttpPaymentGateway::new(settings.gateway.clone()).context("Falha ao criar o cliente do gateway")?,
        );

        match settings.storage {
            StorageBackend::Postgres => {
                let database_url = settings
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;
                let db_pool = PgPoolOptions::new()
                    .max_connections(settings.max_connections)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await
                    .context("Falha ao conectar ao banco de dados")?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                let store = Arc::new(PgRentalStore::new(db_pool.clone(), settings.lock_timeout));
                let notifier = Arc::new(PgNotifier::new(db_pool.clone()));
                let mut state = Self::assemble(store, notifier, gateway, settings);
                state.db_pool = Some(db_pool);
                Ok(state)
            }
            StorageBackend::Memory => {
                tracing::info!("🧪 Backend em memória: nada será persistido");
                Ok(Self::assemble(
                    Arc::new(MemoryRentalStore::new()),
                    Arc::new(MemoryNotifier::new()),
                    gateway,
                    settings,
                ))
            }
        }
    }

    // --- Monta o gráfico de dependências ---
    pub fn assemble(
        store: Arc<dyn RentalStore>,
        notifier: Arc<dyn Notifier>,
        gateway: Arc<dyn PaymentGateway>,
        settings: &Settings,
    ) -> Self {
        let timeout = settings.tx_timeout;
        Self {
            db_pool: None,
            auth_service: AuthService::new(settings.jwt_secret.clone()),
            inventory_service: InventoryService::new(store.clone(), timeout),
            product_service: ProductService::new(store.clone(), timeout),
            quotation_service: QuotationService::new(store.clone(), timeout, notifier.clone()),
            cart_service: CartService::new(store.clone(), timeout, notifier.clone()),
            order_service: OrderService::new(store.clone(), timeout),
            lifecycle_service: LifecycleService::new(store, timeout, notifier.clone(), gateway),
            notification_service: NotificationService::new(notifier),
            webhook_secret: settings.webhook_secret.clone(),
        }
    }
}
