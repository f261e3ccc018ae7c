// src/handlers/reservations.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::reservation::{Reservation, ReservationFilter},
};

// GET /api/reservations
#[utoipa::path(
    get,
    path = "/api/reservations",
    tag = "Reservations",
    params(ReservationFilter),
    responses(
        (status = 200, description = "Reservas, mais recentes primeiro", body = Vec<Reservation>),
        (status = 400, description = "Admin sem filtro")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_reservations(
    State(app_state): State<AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<ReservationFilter>,
) -> Result<impl IntoResponse, AppError> {
    let reservations = app_state.inventory_service.list_reservations(&principal, filter).await?;
    Ok(Json(reservations))
}
