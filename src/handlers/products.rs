// src/handlers/products.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        inventory::{Availability, Inventory, WindowAvailability},
        product::{NewProduct, Product, ProductStatus},
        reservation::RentalWindow,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Furadeira de impacto")]
    pub name: String,

    pub description: Option<String>,

    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub images: Vec<String>,

    #[validate(range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    #[schema(example = 3)]
    pub quantity: i32,

    #[schema(example = "500.00")]
    pub daily_rate: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreated {
    pub product: Product,
    pub inventory: Inventory,
}

// POST /api/products
#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Products",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto e estoque criados", body = ProductCreated),
        (status = 403, description = "Apenas fornecedores cadastram produtos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (product, inventory) = app_state
        .product_service
        .create_product(
            &principal,
            NewProduct {
                owner_id: principal.id,
                name: payload.name,
                description: payload.description,
                category_id: payload.category_id,
                images: payload.images,
                base_quantity: payload.quantity,
                daily_rate: payload.daily_rate,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ProductCreated { product, inventory })))
}

// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Products",
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.product_service.get_product(id).await?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStatusPayload {
    pub status: ProductStatus,
}

// PATCH /api/products/{id}/status
#[utoipa::path(
    patch,
    path = "/api/products/{id}/status",
    tag = "Products",
    request_body = SetStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = Product),
        (status = 403, description = "Não é o dono do produto")
    ),
    params(("id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn set_product_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state
        .product_service
        .set_status(&principal, id, payload.status)
        .await?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestockPayload {
    #[validate(range(min = 1, message = "A quantidade adicionada deve ser positiva."))]
    #[schema(example = 2)]
    pub amount: i32,
}

// POST /api/products/{id}/restock
#[utoipa::path(
    post,
    path = "/api/products/{id}/restock",
    tag = "Products",
    request_body = RestockPayload,
    responses(
        (status = 200, description = "Estoque ampliado", body = Inventory)
    ),
    params(("id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn restock(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestockPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let inventory = app_state
        .product_service
        .increase_quantity(&principal, id, payload.amount)
        .await?;
    Ok(Json(inventory))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecreaseQuantityPayload {
    #[validate(range(min = 1, message = "A quantidade retirada deve ser positiva."))]
    #[schema(example = 1)]
    pub amount: i32,
}

// POST /api/products/{id}/decrease
#[utoipa::path(
    post,
    path = "/api/products/{id}/decrease",
    tag = "Products",
    request_body = DecreaseQuantityPayload,
    responses(
        (status = 200, description = "Estoque reduzido", body = Inventory),
        (status = 400, description = "Total ficaria negativo"),
        (status = 409, description = "Unidades ainda reservadas")
    ),
    params(("id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn decrease_quantity(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecreaseQuantityPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let inventory = app_state
        .product_service
        .decrease_quantity(&principal, id, payload.amount)
        .await?;
    Ok(Json(inventory))
}

// GET /api/products/{id}/availability
#[utoipa::path(
    get,
    path = "/api/products/{id}/availability",
    tag = "Products",
    responses(
        (status = 200, description = "Contadores do estoque", body = Availability)
    ),
    params(("id" = Uuid, Path, description = "ID do Produto")),
    security(("api_jwt" = []))
)]
pub async fn get_availability(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let availability = app_state.inventory_service.get_availability(id).await?;
    Ok(Json(availability))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WindowQuery {
    /// Início da janela (inclusivo)
    pub from: DateTime<Utc>,
    /// Fim da janela (exclusivo)
    pub to: DateTime<Utc>,
}

// GET /api/products/{id}/availability/window?from=..&to=..
#[utoipa::path(
    get,
    path = "/api/products/{id}/availability/window",
    tag = "Products",
    responses(
        (status = 200, description = "Disponibilidade para a janela", body = WindowAvailability),
        (status = 400, description = "Janela inválida")
    ),
    params(("id" = Uuid, Path, description = "ID do Produto"), WindowQuery),
    security(("api_jwt" = []))
)]
pub async fn window_availability(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let window = RentalWindow::new(query.from, query.to)?;
    let availability = app_state.inventory_service.window_availability(id, window).await?;
    Ok(Json(availability))
}
