// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "product_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Available,
    Unavailable,
    Disabled,
}

// --- Produto alugável ---
// Nunca é apagado fisicamente: muda de status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "Furadeira de impacto")]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub images: Vec<String>,
    pub status: ProductStatus,
    #[schema(example = 3)]
    pub base_quantity: i32,
    // Preço por dia usado no carrinho (sem cotação)
    #[schema(example = "500.00")]
    pub daily_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub images: Vec<String>,
    pub base_quantity: i32,
    pub daily_rate: Decimal,
}

/// Cópia congelada do produto no momento do pedido.
/// Edições posteriores no produto não alteram pedidos históricos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<String>,
}

impl From<&Product> for ProductSnapshot {
    fn from(p: &Product) -> Self {
        Self {
            product_id: p.id,
            name: p.name.clone(),
            description: p.description.clone(),
            images: p.images.clone(),
        }
    }
}
