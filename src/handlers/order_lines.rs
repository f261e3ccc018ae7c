// src/handlers/order_lines.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::orders::{RentalOrderLine, ReturnOutcome, TransferDetails},
};

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    #[validate(length(max = 100))]
    #[schema(example = "Transportadora Azul")]
    pub carrier: Option<String>,

    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,

    pub scheduled_at: Option<DateTime<Utc>>,
}

impl From<TransferPayload> for TransferDetails {
    fn from(p: TransferPayload) -> Self {
        Self {
            carrier: p.carrier,
            tracking_number: p.tracking_number,
            scheduled_at: p.scheduled_at,
        }
    }
}

// POST /api/order-lines/{id}/pickup
#[utoipa::path(
    post,
    path = "/api/order-lines/{id}/pickup",
    tag = "Order Lines",
    request_body = TransferPayload,
    responses(
        (status = 200, description = "Item retirado", body = RentalOrderLine),
        (status = 409, description = "Linha não está reservada")
    ),
    params(("id" = Uuid, Path, description = "ID da linha")),
    security(("api_jwt" = []))
)]
pub async fn pickup(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let line = app_state
        .lifecycle_service
        .pickup(&principal, id, payload.into())
        .await?;
    Ok(Json(line))
}

// POST /api/order-lines/{id}/start-use
#[utoipa::path(
    post,
    path = "/api/order-lines/{id}/start-use",
    tag = "Order Lines",
    responses(
        (status = 200, description = "Item em uso", body = RentalOrderLine)
    ),
    params(("id" = Uuid, Path, description = "ID da linha")),
    security(("api_jwt" = []))
)]
pub async fn start_use(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state.lifecycle_service.start_use(&principal, id).await?;
    Ok(Json(line))
}

// POST /api/order-lines/{id}/return
#[utoipa::path(
    post,
    path = "/api/order-lines/{id}/return",
    tag = "Order Lines",
    request_body = TransferPayload,
    responses(
        (status = 200, description = "Item devolvido (com link de pagamento se houver saldo)", body = ReturnOutcome),
        (status = 409, description = "Linha já devolvida ou ainda não retirada"),
        (status = 502, description = "Gateway de pagamento falhou; repita a devolução")
    ),
    params(("id" = Uuid, Path, description = "ID da linha")),
    security(("api_jwt" = []))
)]
pub async fn return_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let outcome = app_state
        .lifecycle_service
        .return_line(&principal, id, payload.into(), Utc::now())
        .await?;
    Ok(Json(outcome))
}

// POST /api/order-lines/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/order-lines/{id}/cancel",
    tag = "Order Lines",
    responses(
        (status = 200, description = "Linha cancelada e estoque liberado", body = RentalOrderLine)
    ),
    params(("id" = Uuid, Path, description = "ID da linha")),
    security(("api_jwt" = []))
)]
pub async fn cancel_line(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let line = app_state.lifecycle_service.cancel_line(&principal, id).await?;
    Ok(Json(line))
}
