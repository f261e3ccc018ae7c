// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::orders::{CustomerOrder, OrderBundle, RentalOrder, RentalOrderDetail, RentalOrderStatus},
};

// =============================================================================
//  PEDIDOS DO CLIENTE
// =============================================================================

// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos do cliente (sem o carrinho)", body = Vec<CustomerOrder>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customer_orders(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.list_customer_orders(&principal).await?;
    Ok(Json(orders))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido com fatias, linhas e reservas", body = OrderBundle),
        (status = 403, description = "Pedido de outro cliente")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido do cliente")),
    security(("api_jwt" = []))
)]
pub async fn get_customer_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = app_state.order_service.get_customer_order(&principal, id).await?;
    Ok(Json(bundle))
}

// POST /api/orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido cancelado em cascata", body = CustomerOrder),
        (status = 409, description = "Algum item já está com o cliente")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido do cliente")),
    security(("api_jwt" = []))
)]
pub async fn cancel_customer_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.lifecycle_service.cancel_customer_order(&principal, id).await?;
    Ok(Json(order))
}

// =============================================================================
//  PEDIDOS DE LOCAÇÃO (FATIA DO FORNECEDOR)
// =============================================================================

// GET /api/orders/rental
#[utoipa::path(
    get,
    path = "/api/orders/rental",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedidos de locação do fornecedor", body = Vec<RentalOrder>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_vendor_orders(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state.order_service.list_vendor_orders(&principal).await?;
    Ok(Json(orders))
}

// GET /api/orders/rental/{id}
#[utoipa::path(
    get,
    path = "/api/orders/rental/{id}",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido de locação com linhas", body = RentalOrderDetail)
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido de locação")),
    security(("api_jwt" = []))
)]
pub async fn get_rental_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.order_service.get_rental_order(&principal, id).await?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRentalOrderStatusPayload {
    pub status: RentalOrderStatus,
}

// PATCH /api/orders/rental/{id}/status
#[utoipa::path(
    patch,
    path = "/api/orders/rental/{id}/status",
    tag = "Orders",
    request_body = UpdateRentalOrderStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = RentalOrder),
        (status = 409, description = "Transição inválida")
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido de locação")),
    security(("api_jwt" = []))
)]
pub async fn update_rental_order_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRentalOrderStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .lifecycle_service
        .update_rental_order_status(&principal, id, payload.status)
        .await?;
    Ok(Json(order))
}

// POST /api/orders/rental/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/orders/rental/{id}/cancel",
    tag = "Orders",
    responses(
        (status = 200, description = "Pedido de locação cancelado", body = RentalOrder)
    ),
    params(("id" = Uuid, Path, description = "ID do Pedido de locação")),
    security(("api_jwt" = []))
)]
pub async fn cancel_rental_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.lifecycle_service.cancel_rental_order(&principal, id).await?;
    Ok(Json(order))
}
