// src/models/reservation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::{error::AppError, lifecycle::Lifecycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Reserved,
    Active,
    Returned,
    Cancelled,
}

impl ReservationStatus {
    /// Status que ocupam capacidade na consulta de sobreposição.
    pub const HOLDING: [ReservationStatus; 2] = [ReservationStatus::Reserved, ReservationStatus::Active];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Active => "active",
            ReservationStatus::Returned => "returned",
            ReservationStatus::Cancelled => "cancelled",
        }
    }
}

impl Lifecycle for ReservationStatus {
    const ENTITY: &'static str = "Reserva";

    fn allowed_next(self) -> &'static [Self] {
        use ReservationStatus::*;
        match self {
            Reserved => &[Active, Returned, Cancelled],
            Active => &[Returned, Cancelled],
            Returned | Cancelled => &[],
        }
    }
}

/// Intervalo semiaberto `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl RentalWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, AppError> {
        if from >= to {
            return Err(AppError::Validation(
                "A data de devolução deve ser posterior à data de retirada.".into(),
            ));
        }
        Ok(Self { from, to })
    }

    /// Duas janelas se cruzam sse `a.from < b.to && a.to > b.from`.
    /// Uma reserva que termina exatamente quando a outra começa não conflita.
    pub fn overlaps(&self, other: &RentalWindow) -> bool {
        self.from < other.to && self.to > other.from
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }

    /// Dias cobrados (fração de dia conta como dia inteiro).
    pub fn billable_days(&self) -> i64 {
        let secs = (self.to - self.from).num_seconds();
        (secs + 86_399) / 86_400
    }

    /// Menor janela que cobre as duas.
    pub fn union(&self, other: &RentalWindow) -> RentalWindow {
        RentalWindow {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

// --- Reserva: trava de N unidades em uma janela ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub customer_order_id: Option<Uuid>,
    pub rental_order_id: Option<Uuid>,
    pub quotation_id: Option<Uuid>,
    pub quantity: i32,
    pub from_at: DateTime<Utc>,
    pub to_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn window(&self) -> RentalWindow {
        RentalWindow { from: self.from_at, to: self.to_at }
    }

    pub fn is_holding(&self) -> bool {
        ReservationStatus::HOLDING.contains(&self.status)
    }
}

/// Listagem por cliente (via pedido do cliente) ou por fornecedor (dono do produto).
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReservationFilter {
    /// Reservas dos pedidos deste cliente
    pub customer_id: Option<Uuid>,
    /// Reservas dos produtos deste fornecedor
    pub vendor_id: Option<Uuid>,
}

impl ReservationFilter {
    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.vendor_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub product_id: Uuid,
    pub customer_order_id: Option<Uuid>,
    pub rental_order_id: Option<Uuid>,
    pub quotation_id: Option<Uuid>,
    pub quantity: i32,
    pub window: RentalWindow,
    pub status: ReservationStatus,
}

/// Maior quantidade segurada ao mesmo tempo por um conjunto de reservas.
/// Término e início no mesmo instante não se somam (janelas semiabertas).
pub fn peak_concurrent(reservations: &[Reservation]) -> i64 {
    let mut events: Vec<(DateTime<Utc>, i64)> = Vec::with_capacity(reservations.len() * 2);
    for r in reservations {
        events.push((r.from_at, i64::from(r.quantity)));
        events.push((r.to_at, -i64::from(r.quantity)));
    }
    // No mesmo instante, saídas antes de entradas
    events.sort_by_key(|&(at, delta)| (at, delta));

    let mut current = 0;
    let mut peak = 0;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak
}
