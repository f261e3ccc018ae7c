// src/handlers/quotations.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        orders::{OrderBundle, PaymentType},
        quotation::{Charges, NewQuotation, PriceComponent, Quotation, QuotationFilter, QuotationPatch},
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationPayload {
    pub product_id: Uuid,

    // Vazio = cotação aberta a qualquer cliente
    pub customer_id: Option<Uuid>,

    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    #[schema(example = 1)]
    pub requested_quantity: i32,

    #[serde(default)]
    pub charges: Charges,

    pub pickup_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,

    #[validate(length(max = 500))]
    pub pickup_address: Option<String>,
    #[validate(length(max = 500))]
    pub return_address: Option<String>,

    #[serde(default)]
    pub pricing_breakdown: Vec<PriceComponent>,

    #[schema(example = "1500.00")]
    pub total_amount: Decimal,

    pub expires_at: Option<DateTime<Utc>>,
}

// POST /api/quotations
#[utoipa::path(
    post,
    path = "/api/quotations",
    tag = "Quotations",
    request_body = CreateQuotationPayload,
    responses(
        (status = 201, description = "Cotação criada", body = Quotation),
        (status = 403, description = "Produto de outro fornecedor")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_quotation(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateQuotationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quotation = app_state
        .quotation_service
        .create_quotation(
            &principal,
            NewQuotation {
                product_id: payload.product_id,
                customer_id: payload.customer_id,
                requested_quantity: payload.requested_quantity,
                charges: payload.charges,
                pickup_at: payload.pickup_at,
                return_at: payload.return_at,
                pickup_address: payload.pickup_address,
                return_address: payload.return_address,
                pricing_breakdown: payload.pricing_breakdown,
                total_amount: payload.total_amount,
                expires_at: payload.expires_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(quotation)))
}

// GET /api/quotations
#[utoipa::path(
    get,
    path = "/api/quotations",
    tag = "Quotations",
    responses(
        (status = 200, description = "Cotações visíveis ao chamador", body = Vec<Quotation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_quotations(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<QuotationFilter>,
) -> Result<impl IntoResponse, AppError> {
    let quotations = app_state.quotation_service.list_quotations(&principal, filter).await?;
    Ok(Json(quotations))
}

// GET /api/quotations/{id}
#[utoipa::path(
    get,
    path = "/api/quotations/{id}",
    tag = "Quotations",
    responses(
        (status = 200, description = "Cotação", body = Quotation),
        (status = 404, description = "Cotação não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da Cotação")),
    security(("api_jwt" = []))
)]
pub async fn get_quotation(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = app_state.quotation_service.get_quotation(&principal, id).await?;
    Ok(Json(quotation))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotationPayload {
    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    pub requested_quantity: Option<i32>,
    pub charges: Option<Charges>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub return_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub pickup_address: Option<String>,
    #[validate(length(max = 500))]
    pub return_address: Option<String>,
    pub pricing_breakdown: Option<Vec<PriceComponent>>,
    pub total_amount: Option<Decimal>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<UpdateQuotationPayload> for QuotationPatch {
    fn from(p: UpdateQuotationPayload) -> Self {
        Self {
            requested_quantity: p.requested_quantity,
            charges: p.charges,
            pickup_at: p.pickup_at,
            return_at: p.return_at,
            pickup_address: p.pickup_address,
            return_address: p.return_address,
            pricing_breakdown: p.pricing_breakdown,
            total_amount: p.total_amount,
            expires_at: p.expires_at,
        }
    }
}

// PATCH /api/quotations/{id}
#[utoipa::path(
    patch,
    path = "/api/quotations/{id}",
    tag = "Quotations",
    request_body = UpdateQuotationPayload,
    responses(
        (status = 200, description = "Cotação atualizada", body = Quotation),
        (status = 409, description = "Cotação não está mais pendente")
    ),
    params(("id" = Uuid, Path, description = "ID da Cotação")),
    security(("api_jwt" = []))
)]
pub async fn update_quotation(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let quotation = app_state
        .quotation_service
        .update_quotation(&principal, id, payload.into(), Utc::now())
        .await?;
    Ok(Json(quotation))
}

// POST /api/quotations/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/quotations/{id}/cancel",
    tag = "Quotations",
    responses(
        (status = 200, description = "Cotação cancelada", body = Quotation)
    ),
    params(("id" = Uuid, Path, description = "ID da Cotação")),
    security(("api_jwt" = []))
)]
pub async fn cancel_quotation(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = app_state.quotation_service.cancel_quotation(&principal, id).await?;
    Ok(Json(quotation))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptQuotationsPayload {
    #[validate(length(min = 1, message = "Informe pelo menos uma cotação."))]
    pub quotation_ids: Vec<Uuid>,
    pub payment_type: PaymentType,
}

// POST /api/quotations/accept
#[utoipa::path(
    post,
    path = "/api/quotations/accept",
    tag = "Quotations",
    request_body = AcceptQuotationsPayload,
    responses(
        (status = 201, description = "Pedido criado a partir das cotações", body = OrderBundle),
        (status = 400, description = "Cotação inexistente ou não pendente"),
        (status = 409, description = "Sem disponibilidade para alguma janela")
    ),
    security(("api_jwt" = []))
)]
pub async fn accept_quotations(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<AcceptQuotationsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let bundle = app_state
        .quotation_service
        .accept_many(&principal, &payload.quotation_ids, payload.payment_type, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}
