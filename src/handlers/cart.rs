// src/handlers/cart.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
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
    models::orders::{CartView, OrderBundle, PaymentType},
    services::cart_service::CartItemPatch,
};

// GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    tag = "Cart",
    responses(
        (status = 200, description = "Carrinho atual (vazio se não houver)", body = CartView)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_cart(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state.cart_service.get_cart(&principal).await?;
    Ok(Json(cart))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    #[schema(example = 1)]
    pub quantity: i32,

    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

// POST /api/cart/items
#[utoipa::path(
    post,
    path = "/api/cart/items",
    tag = "Cart",
    request_body = AddToCartPayload,
    responses(
        (status = 201, description = "Item adicionado", body = CartView),
        (status = 409, description = "Produto já está no carrinho ou sem estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_to_cart(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<AddToCartPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let cart = app_state
        .cart_service
        .add_to_cart(&principal, payload.product_id, payload.quantity, payload.from, payload.to, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartItemPayload {
    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    pub quantity: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// PATCH /api/cart/items/{line_id}
#[utoipa::path(
    patch,
    path = "/api/cart/items/{line_id}",
    tag = "Cart",
    request_body = UpdateCartItemPayload,
    responses(
        (status = 200, description = "Item atualizado", body = CartView)
    ),
    params(("line_id" = Uuid, Path, description = "ID da linha do carrinho")),
    security(("api_jwt" = []))
)]
pub async fn update_cart_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(line_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let patch = CartItemPatch {
        quantity: payload.quantity,
        from: payload.from,
        to: payload.to,
    };
    let cart = app_state
        .cart_service
        .update_cart_item(&principal, line_id, patch, Utc::now())
        .await?;
    Ok(Json(cart))
}

// DELETE /api/cart/items/{line_id}
#[utoipa::path(
    delete,
    path = "/api/cart/items/{line_id}",
    tag = "Cart",
    responses(
        (status = 200, description = "Item removido", body = CartView)
    ),
    params(("line_id" = Uuid, Path, description = "ID da linha do carrinho")),
    security(("api_jwt" = []))
)]
pub async fn remove_from_cart(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(line_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = app_state.cart_service.remove_from_cart(&principal, line_id).await?;
    Ok(Json(cart))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub payment_type: PaymentType,
}

// POST /api/cart/checkout
#[utoipa::path(
    post,
    path = "/api/cart/checkout",
    tag = "Cart",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Carrinho convertido em pedido", body = OrderBundle),
        (status = 409, description = "Sem disponibilidade para alguma janela")
    ),
    security(("api_jwt" = []))
)]
pub async fn checkout(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = app_state
        .cart_service
        .checkout(&principal, payload.payment_type, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}
