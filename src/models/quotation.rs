// src/models/quotation.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::lifecycle::Lifecycle;
use crate::models::reservation::RentalWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "quotation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl Lifecycle for QuotationStatus {
    const ENTITY: &'static str = "Cotação";

    fn allowed_next(self) -> &'static [Self] {
        use QuotationStatus::*;
        match self {
            Draft => &[Sent, Pending, Cancelled],
            Sent => &[Pending, Expired, Cancelled],
            // Accepted só via acceptMany
            Pending => &[Accepted, Expired, Cancelled],
            Accepted | Expired | Cancelled => &[],
        }
    }
}

/// Tabela de cobrança extra usada no cálculo de multa por atraso.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Charges {
    #[serde(default)]
    #[schema(example = "50.00")]
    pub extra_hour_price: Decimal,
    #[serde(default)]
    #[schema(example = "500.00")]
    pub extra_day_price: Decimal,
    #[serde(default)]
    #[schema(example = "3000.00")]
    pub extra_week_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceComponent {
    #[schema(example = "Aluguel (3 dias)")]
    pub label: String,
    #[schema(example = "1500.00")]
    pub amount: Decimal,
}

// --- Cotação: oferta do fornecedor, com preço e janela ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub owner_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub requested_quantity: i32,
    #[sqlx(json)]
    pub charges: Charges,
    pub pickup_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
    pub pickup_address: Option<String>,
    pub return_address: Option<String>,
    #[sqlx(json)]
    pub pricing_breakdown: Vec<PriceComponent>,
    pub total_amount: Decimal,
    pub status: QuotationStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    pub fn window(&self) -> RentalWindow {
        RentalWindow { from: self.pickup_at, to: self.return_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Pendente e dentro da validade.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == QuotationStatus::Pending && !self.is_expired(now)
    }
}

#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub product_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub requested_quantity: i32,
    pub charges: Charges,
    pub pickup_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
    pub pickup_address: Option<String>,
    pub return_address: Option<String>,
    pub pricing_breakdown: Vec<PriceComponent>,
    pub total_amount: Decimal,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Campos editáveis enquanto a cotação está pendente.
#[derive(Debug, Clone, Default)]
pub struct QuotationPatch {
    pub requested_quantity: Option<i32>,
    pub charges: Option<Charges>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub return_at: Option<DateTime<Utc>>,
    pub pickup_address: Option<String>,
    pub return_address: Option<String>,
    pub pricing_breakdown: Option<Vec<PriceComponent>>,
    pub total_amount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationFilter {
    pub vendor_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub status: Option<QuotationStatus>,
}

impl QuotationFilter {
    pub fn matches(&self, q: &Quotation) -> bool {
        self.vendor_id.is_none_or(|v| v == q.owner_id)
            && self.customer_id.is_none_or(|c| q.customer_id == Some(c))
            && self.product_id.is_none_or(|p| p == q.product_id)
            && self.status.is_none_or(|s| s == q.status)
    }
}
