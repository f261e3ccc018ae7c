// src/db/inventory_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inventory::Inventory,
        reservation::{NewReservation, RentalWindow, Reservation, ReservationFilter, ReservationStatus},
    },
};

// Livro de estoque + reservas: os dois únicos estados mutáveis compartilhados.
// Toda função aqui recebe o executor da transação do chamador.
#[derive(Clone, Copy, Default)]
pub struct InventoryRepository;

impl InventoryRepository {
    /// Cria a linha única de estoque do produto (total = disponível).
    pub async fn create_inventory<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        total: i32,
    ) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Inventory>(
            r#"
            INSERT INTO inventories (product_id, total_quantity, available_quantity, reserved_quantity)
            VALUES ($1, $2, $2, 0)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(total)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "O produto {} já possui linha de estoque.",
                        product_id
                    ));
                }
            }
            e.into()
        })
    }

    /// SELECT ... FOR UPDATE: segura a linha até o commit/rollback.
    pub async fn get_inventory_for_update<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<Inventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let inventory = sqlx::query_as::<_, Inventory>(
            "SELECT * FROM inventories WHERE product_id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(inventory)
    }

    pub async fn write_counters<'e, E>(
        &self,
        executor: E,
        inventory: &Inventory,
    ) -> Result<Inventory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Inventory>(
            r#"
            UPDATE inventories
            SET total_quantity = $2,
                available_quantity = $3,
                reserved_quantity = $4,
                updated_at = NOW()
            WHERE product_id = $1
            RETURNING *
            "#,
        )
        .bind(inventory.product_id)
        .bind(inventory.total_quantity)
        .bind(inventory.available_quantity)
        .bind(inventory.reserved_quantity)
        .fetch_optional(executor)
        .await?;

        updated.ok_or_else(|| AppError::not_found("Estoque do produto", inventory.product_id))
    }

    // ---
    // Reservas
    // ---

    /// Semântica semiaberta: `from_at < to AND to_at > from`.
    pub async fn overlapping_quantity<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        window: RentalWindow,
        statuses: &[ReservationStatus],
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let (sum,): (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM reservations
            WHERE product_id = $1
              AND status::text = ANY($2)
              AND from_at < $4
              AND to_at > $3
            "#,
        )
        .bind(product_id)
        .bind(statuses)
        .bind(window.from)
        .bind(window.to)
        .fetch_one(executor)
        .await?;

        Ok(sum)
    }

    /// Reservas que ainda ocupam capacidade, para recalcular o pico do livro.
    pub async fn list_holding_reservations<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Vec<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let statuses: Vec<&str> = ReservationStatus::HOLDING.iter().map(|s| s.as_str()).collect();

        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE product_id = $1 AND status::text = ANY($2)
            ORDER BY from_at ASC
            "#,
        )
        .bind(product_id)
        .bind(statuses)
        .fetch_all(executor)
        .await?;

        Ok(reservations)
    }

    pub async fn create_reservation<'e, E>(
        &self,
        executor: E,
        new: &NewReservation,
    ) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                product_id, customer_order_id, rental_order_id, quotation_id,
                quantity, from_at, to_at, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.product_id)
        .bind(new.customer_order_id)
        .bind(new.rental_order_id)
        .bind(new.quotation_id)
        .bind(new.quantity)
        .bind(new.window.from)
        .bind(new.window.to)
        .bind(new.status)
        .fetch_one(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn find_reservation<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(reservation)
    }

    pub async fn list_reservations<'e, E>(
        &self,
        executor: E,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT r.* FROM reservations r
            JOIN products p ON p.id = r.product_id
            LEFT JOIN customer_orders co ON co.id = r.customer_order_id
            WHERE ($1::uuid IS NULL OR co.customer_id = $1)
              AND ($2::uuid IS NULL OR p.owner_id = $2)
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(filter.customer_id)
        .bind(filter.vendor_id)
        .fetch_all(executor)
        .await?;

        Ok(reservations)
    }

    pub async fn set_reservation_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        reservation.ok_or_else(|| AppError::not_found("Reserva", id))
    }
}
