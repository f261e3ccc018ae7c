// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::lifecycle::Lifecycle;
use crate::models::product::ProductSnapshot;
use crate::models::quotation::PriceComponent;
use crate::models::reservation::{RentalWindow, Reservation};

// =============================================================================
//  ENUMS + TABELAS DE TRANSIÇÃO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CustomerOrderStatus {
    Draft,
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl Lifecycle for CustomerOrderStatus {
    const ENTITY: &'static str = "Pedido do cliente";

    fn allowed_next(self) -> &'static [Self] {
        use CustomerOrderStatus::*;
        match self {
            Draft => &[Pending, Cancelled],
            Pending => &[Paid, Completed, Cancelled],
            Paid => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Pago integralmente na reserva: nada a cobrar na devolução além de multa.
    FullUpfront,
    /// Sinal/depósito: o saldo é cobrado na devolução.
    PartialDeposit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "rental_order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RentalOrderStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl Lifecycle for RentalOrderStatus {
    const ENTITY: &'static str = "Pedido de locação";

    fn allowed_next(self) -> &'static [Self] {
        use RentalOrderStatus::*;
        match self {
            Pending => &[Confirmed, InProgress, Cancelled],
            Confirmed => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "line_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Reserved,
    Picked,
    InUse,
    ReturnedPaid,
    ReturnedPendingPayment,
    Cancelled,
}

impl LineStatus {
    pub fn is_returned(self) -> bool {
        matches!(self, LineStatus::ReturnedPaid | LineStatus::ReturnedPendingPayment)
    }

    /// Nada mais acontece fisicamente com a linha.
    pub fn is_settled_physically(self) -> bool {
        self.is_returned() || self == LineStatus::Cancelled
    }
}

impl Lifecycle for LineStatus {
    const ENTITY: &'static str = "Linha do pedido";

    fn allowed_next(self) -> &'static [Self] {
        use LineStatus::*;
        match self {
            Reserved => &[Picked, Cancelled],
            Picked => &[InUse, ReturnedPaid, ReturnedPendingPayment, Cancelled],
            InUse => &[ReturnedPaid, ReturnedPendingPayment],
            // Quitação via webhook do link de pagamento
            ReturnedPendingPayment => &[ReturnedPaid],
            ReturnedPaid | Cancelled => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "transfer_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransferKind {
    Pickup,
    Return,
}

// =============================================================================
//  ENTIDADES
// =============================================================================

// --- Pedido do cliente: agregado de um checkout ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: CustomerOrderStatus,
    #[schema(example = "2500.00")]
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub payment_type: PaymentType,
    // Alimentado pelo webhook de pagamento; o núcleo só lê
    pub paid_amount: Decimal,
    pub rent_from: Option<DateTime<Utc>>,
    pub rent_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomerOrder {
    pub customer_id: Uuid,
    pub status: CustomerOrderStatus,
    pub total_amount: Decimal,
    pub payment_type: PaymentType,
    pub window: Option<RentalWindow>,
}

// --- Fatia de um fornecedor dentro do pedido do cliente ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalOrder {
    pub id: Uuid,
    pub customer_order_id: Uuid,
    pub vendor_id: Uuid,
    pub status: RentalOrderStatus,
    pub total_amount: Decimal,
    #[schema(example = 2)]
    pub owner_reminder_gap_days: i32,
    #[schema(example = 2)]
    pub customer_reminder_gap_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const DEFAULT_REMINDER_GAP_DAYS: i32 = 2;

// --- Linha: a unidade do que está de fato "na mão" do cliente ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalOrderLine {
    pub id: Uuid,
    pub rental_order_id: Uuid,
    pub quotation_id: Option<Uuid>,
    pub product_id: Uuid,
    #[sqlx(json)]
    pub product_snapshot: ProductSnapshot,
    pub quantity: i32,
    pub from_at: DateTime<Utc>,
    pub to_at: DateTime<Utc>,
    pub unit_price: Decimal,
    #[sqlx(json)]
    pub extras: Vec<PriceComponent>,
    pub line_total: Decimal,
    pub reservation_id: Option<Uuid>,
    pub transfer_id: Option<Uuid>,
    pub status: LineStatus,
    pub late_fee: Decimal,
    pub remaining_amount: Decimal,
    // Preenchido na primeira tentativa de devolução (estoque já liberado)
    pub returned_at: Option<DateTime<Utc>>,
    pub payment_link_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RentalOrderLine {
    pub fn window(&self) -> RentalWindow {
        RentalWindow { from: self.from_at, to: self.to_at }
    }
}

#[derive(Debug, Clone)]
pub struct NewRentalOrderLine {
    pub rental_order_id: Uuid,
    pub quotation_id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_snapshot: ProductSnapshot,
    pub quantity: i32,
    pub window: RentalWindow,
    pub unit_price: Decimal,
    pub extras: Vec<PriceComponent>,
    pub line_total: Decimal,
    pub reservation_id: Option<Uuid>,
}

// --- Registro de retirada/devolução física ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: Uuid,
    pub rental_order_line_id: Uuid,
    pub kind: TransferKind,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferDetails {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

// =============================================================================
//  RESPOSTAS COMPOSTAS
// =============================================================================

/// Tudo o que um checkout/aceite criou, aninhado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderBundle {
    pub customer_order: CustomerOrder,
    pub rental_orders: Vec<RentalOrder>,
    pub lines: Vec<RentalOrderLine>,
    pub reservations: Vec<Reservation>,
}

/// Visão do fornecedor: a sua fatia e as linhas dela.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalOrderDetail {
    pub rental_order: RentalOrder,
    pub lines: Vec<RentalOrderLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub customer_order: Option<CustomerOrder>,
    pub rental_orders: Vec<RentalOrder>,
    pub lines: Vec<RentalOrderLine>,
    pub total_amount: Decimal,
}

impl CartView {
    pub fn empty() -> Self {
        Self {
            customer_order: None,
            rental_orders: vec![],
            lines: vec![],
            total_amount: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnOutcome {
    pub line: RentalOrderLine,
    pub late_fee: Decimal,
    pub remaining_amount: Decimal,
    pub payment_link_url: Option<String>,
}
